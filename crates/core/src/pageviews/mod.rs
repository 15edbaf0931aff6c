//! Per-article pageview series from the Wikimedia REST v1 API
//!
//! Pageviews are available from August 2015 onward; for older data see
//! the [`historical`] Wikishark client.

pub mod historical;

use crate::config::PageviewsConfig;
use crate::dates::resolve_range;
use crate::errors::{Result, WikinowError};
use crate::metrics;
use crate::{normalize_title, validate_lang};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Access-method filter for pageview counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    AllAccess,
    Desktop,
    MobileApp,
    MobileWeb,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::AllAccess => "all-access",
            Access::Desktop => "desktop",
            Access::MobileApp => "mobile-app",
            Access::MobileWeb => "mobile-web",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Access {
    type Err = WikinowError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "all-access" => Ok(Access::AllAccess),
            "desktop" => Ok(Access::Desktop),
            "mobile-app" => Ok(Access::MobileApp),
            "mobile-web" => Ok(Access::MobileWeb),
            other => Err(WikinowError::invalid_argument(format!(
                "unknown access filter '{}'",
                other
            ))),
        }
    }
}

/// Agent-type filter for pageview counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Agents {
    #[default]
    AllAgents,
    User,
    Bot,
    Spider,
}

impl Agents {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agents::AllAgents => "all-agents",
            Agents::User => "user",
            Agents::Bot => "bot",
            Agents::Spider => "spider",
        }
    }
}

impl fmt::Display for Agents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Agents {
    type Err = WikinowError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "all-agents" => Ok(Agents::AllAgents),
            "user" => Ok(Agents::User),
            "bot" => Ok(Agents::Bot),
            "spider" => Ok(Agents::Spider),
            other => Err(WikinowError::invalid_argument(format!(
                "unknown agent filter '{}'",
                other
            ))),
        }
    }
}

/// Time unit of the REST series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = WikinowError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(WikinowError::invalid_argument(format!(
                "unknown interval '{}', expected daily or monthly",
                other
            ))),
        }
    }
}

/// Parameters of one REST pageview fetch
#[derive(Debug, Clone, Validate)]
pub struct PageviewQuery {
    #[validate(length(min = 1, message = "a valid title should be specified"))]
    pub title: String,

    #[validate(length(min = 1, message = "a valid language should be specified"))]
    pub lang: String,

    pub access: Access,
    pub agents: Agents,
    pub granularity: Granularity,

    /// First date of the range; both dates absent means today
    pub first: Option<String>,
    /// Last date of the range; absent collapses to the first date
    pub last: Option<String>,
}

impl PageviewQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lang: "en".to_string(),
            access: Access::default(),
            agents: Agents::default(),
            granularity: Granularity::default(),
            first: None,
            last: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_range(mut self, first: Option<String>, last: Option<String>) -> Self {
        self.first = first;
        self.last = last;
        self
    }
}

/// A pageview time series as parallel date/count sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageviewSeries {
    pub dates: Vec<NaiveDate>,
    pub views: Vec<u64>,
}

impl PageviewSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Iterate dates paired with their view counts
    pub fn pairs(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.dates.iter().copied().zip(self.views.iter().copied())
    }
}

/// Client for the Wikimedia REST v1 per-article pageviews endpoint
pub struct PageviewsClient {
    client: reqwest::Client,
    api_base: String,
}

impl PageviewsClient {
    pub fn new(config: &PageviewsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Validate the query and assemble the request URL
    fn request_url(&self, query: &PageviewQuery) -> Result<String> {
        query.validate()?;
        validate_lang(&query.lang)?;

        let (first, last) = resolve_range(query.first.as_deref(), query.last.as_deref())?;
        let title = urlencoding::encode(&normalize_title(&query.title)).into_owned();

        Ok(format!(
            "{}/metrics/pageviews/per-article/{}.wikipedia/{}/{}/{}/{}/{}/{}",
            self.api_base,
            query.lang,
            query.access,
            query.agents,
            title,
            query.granularity,
            first.format("%Y%m%d"),
            last.format("%Y%m%d"),
        ))
    }

    /// Fetch the pageview series for one article
    pub async fn article_views(&self, query: &PageviewQuery) -> Result<PageviewSeries> {
        let url = self.request_url(query)?;

        tracing::info!(title = %query.title, lang = %query.lang, "Fetching pageview series");

        let timer = metrics::FetchTimer::start();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            metrics::record_pageview_fetch(timer.elapsed_secs(), "rest", false);
            return Err(upstream_error(status.as_u16(), &body));
        }

        let series = decode_series(&body)?;
        metrics::record_pageview_fetch(timer.elapsed_secs(), "rest", true);

        Ok(series)
    }
}

#[derive(Deserialize)]
struct SeriesBody {
    items: Option<Vec<SeriesItem>>,
}

#[derive(Deserialize)]
struct SeriesItem {
    timestamp: String,
    views: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Turn a non-success REST response into an upstream error, surfacing
/// the API's `detail` message when the body carries one
fn upstream_error(status: u16, body: &str) -> WikinowError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.detail);

    WikinowError::Upstream {
        service: "wikimedia-rest".into(),
        status,
        message: detail.unwrap_or_else(|| "pageview request failed".into()),
    }
}

/// Decode a success body into a series; a missing `items` array means
/// the request returned no information
fn decode_series(body: &str) -> Result<PageviewSeries> {
    let body: SeriesBody = serde_json::from_str(body)?;

    let items = body.items.ok_or_else(|| {
        WikinowError::payload("wikimedia-rest", "the request did not return any information")
    })?;

    let mut dates = Vec::with_capacity(items.len());
    let mut views = Vec::with_capacity(items.len());

    for item in items {
        // Timestamps come as YYYYMMDDHH; the hour is always zero for
        // daily and monthly series. get() rejects short values and
        // non-ASCII garbage without panicking on a char boundary.
        let day = item.timestamp.get(..8).ok_or_else(|| {
            WikinowError::payload(
                "wikimedia-rest",
                format!("malformed timestamp '{}'", item.timestamp),
            )
        })?;
        let date = NaiveDate::parse_from_str(day, "%Y%m%d").map_err(|_| {
            WikinowError::payload(
                "wikimedia-rest",
                format!("malformed timestamp '{}'", item.timestamp),
            )
        })?;

        dates.push(date);
        views.push(item.views);
    }

    Ok(PageviewSeries { dates, views })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WikinowConfig;

    fn client() -> PageviewsClient {
        PageviewsClient::new(&WikinowConfig::default().pageviews).unwrap()
    }

    #[test]
    fn test_request_url_assembly() {
        let query = PageviewQuery::new("Sore throat")
            .with_lang("de")
            .with_range(Some("2020-01-10".into()), Some("2020-01-20".into()));

        let url = client().request_url(&query).unwrap();

        assert_eq!(
            url,
            "https://wikimedia.org/api/rest_v1/metrics/pageviews/per-article/\
             de.wikipedia/all-access/all-agents/Sore_throat/daily/20200110/20200120"
        );
    }

    #[test]
    fn test_missing_last_date_collapses_to_single_day() {
        let query = PageviewQuery::new("Influenza").with_range(Some("2020-01-10".into()), None);

        let url = client().request_url(&query).unwrap();

        assert!(url.ends_with("/daily/20200110/20200110"), "got: {}", url);
    }

    #[test]
    fn test_inverted_range_fails_validation() {
        let query = PageviewQuery::new("Influenza")
            .with_range(Some("2020-02-01".into()), Some("2020-01-01".into()));

        let err = client().request_url(&query).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("mobile-app".parse::<Access>().unwrap(), Access::MobileApp);
        assert_eq!("spider".parse::<Agents>().unwrap(), Agents::Spider);
        assert_eq!("monthly".parse::<Granularity>().unwrap(), Granularity::Monthly);

        assert!("everything".parse::<Access>().is_err());
        assert!("hourly".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_decode_series() {
        let body = r#"{
            "items": [
                { "project": "de.wikipedia", "timestamp": "2020011000", "views": 4211 },
                { "project": "de.wikipedia", "timestamp": "2020011100", "views": 3999 }
            ]
        }"#;

        let series = decode_series(body).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.dates[0], NaiveDate::from_ymd_opt(2020, 1, 10).unwrap());
        assert_eq!(series.views, vec![4211, 3999]);
    }

    #[test]
    fn test_decode_malformed_timestamp_is_payload_error() {
        // Too short
        let body = r#"{ "items": [ { "timestamp": "202001", "views": 1 } ] }"#;
        assert!(matches!(
            decode_series(body).unwrap_err(),
            WikinowError::Payload { .. }
        ));

        // Multibyte characters: long enough in bytes, but byte offset 8
        // falls inside a character
        let body = r#"{ "items": [ { "timestamp": "日本語", "views": 1 } ] }"#;
        assert!(matches!(
            decode_series(body).unwrap_err(),
            WikinowError::Payload { .. }
        ));
    }

    #[test]
    fn test_decode_missing_items_is_payload_error() {
        let err = decode_series(r#"{ "type": "about" }"#).unwrap_err();
        assert!(matches!(err, WikinowError::Payload { .. }));
    }

    #[test]
    fn test_upstream_detail_is_surfaced() {
        let body = r#"{ "type": "not_found", "detail": "The date(s) you used are valid, but we either do not have data for those date(s), or the project you asked for is not loaded yet." }"#;

        let err = upstream_error(404, body);

        assert!(err.to_string().contains("we either do not have data"));
    }

    #[test]
    fn test_upstream_without_detail_is_generic() {
        let err = upstream_error(500, "<html>oops</html>");
        assert!(matches!(err, WikinowError::Upstream { status: 500, .. }));
    }
}
