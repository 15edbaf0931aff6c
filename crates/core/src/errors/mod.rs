//! Error types for wikinow
//!
//! Every failure is surfaced through the single [`WikinowError`] enum so
//! callers only ever deal with one error kind. The taxonomy follows the
//! failure modes of the retrieval pipeline:
//! - invalid arguments, raised before any network access
//! - upstream errors, non-success responses from a remote service
//! - payload errors, a success response missing an expected field

use thiserror::Error;

/// Result type alias using WikinowError
pub type Result<T> = std::result::Result<T, WikinowError>;

/// Application error types
#[derive(Error, Debug)]
pub enum WikinowError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Upstream error from {service} (status {status}): {message}")]
    Upstream {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected payload from {service}: {message}")]
    Payload { service: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl WikinowError {
    /// Shorthand for a validation failure
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        WikinowError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a missing or malformed field in a success response
    pub fn payload(service: impl Into<String>, message: impl Into<String>) -> Self {
        WikinowError::Payload {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any network access
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, WikinowError::InvalidArgument { .. })
    }
}

impl From<validator::ValidationErrors> for WikinowError {
    fn from(err: validator::ValidationErrors) -> Self {
        WikinowError::InvalidArgument {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_classification() {
        let err = WikinowError::invalid_argument("a valid title should be specified");
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_upstream_message() {
        let err = WikinowError::Upstream {
            service: "wikipedia".into(),
            status: 503,
            message: "service unavailable".into(),
        };
        assert!(!err.is_invalid_argument());
        assert!(err.to_string().contains("503"));
    }
}
