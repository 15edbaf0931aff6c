//! Wikinow Core Library
//!
//! Wikipedia interest signals for nowcasting pipelines:
//! - Related-topic discovery over the article link graph
//! - Per-article pageview series (Wikimedia REST, August 2015 onward)
//! - Historical pageview series (Wikishark, 2008 to 2015)
//!
//! Everything is a plain callable on a client or resolver value; there
//! are no load-time side effects. Remote access sits behind the
//! [`linkgraph::LinkGraph`] and [`pacing::Pacer`] capabilities so the
//! traversal logic can be exercised offline.

pub mod config;
pub mod dates;
pub mod errors;
pub mod linkgraph;
pub mod metrics;
pub mod pacing;
pub mod pageviews;
pub mod related;

// Re-export commonly used types
pub use config::WikinowConfig;
pub use errors::{Result, WikinowError};
pub use pageviews::historical::{HistoryGranularity, HistoryQuery, WikisharkClient};
pub use pageviews::{Access, Agents, Granularity, PageviewQuery, PageviewSeries, PageviewsClient};
pub use related::{RelatedQuery, RelatedResolver, RelatedTopics, SelectionMethod};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Canonical article form used in API requests: spaces become underscores
pub fn normalize_title(title: &str) -> String {
    title.replace(' ', "_")
}

/// Language codes are interpolated into API hostnames and paths, so
/// only hostname-safe characters are accepted
pub(crate) fn validate_lang(lang: &str) -> Result<()> {
    let safe = !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');

    if safe {
        Ok(())
    } else {
        Err(WikinowError::invalid_argument(format!(
            "language '{}' is not a valid wiki code",
            lang
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Sore throat"), "Sore_throat");
        assert_eq!(normalize_title("Influenza"), "Influenza");
    }

    #[test]
    fn test_validate_lang() {
        assert!(validate_lang("en").is_ok());
        assert!(validate_lang("zh-yue").is_ok());
        assert!(validate_lang("").is_err());
        assert!(validate_lang("en wiki").is_err());
        assert!(validate_lang("en/../admin").is_err());
    }
}
