// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// All fetch attempts for a URL were spent
    #[error("Failed to fetch {url} after {attempts} attempt(s): {cause}")]
    Fetch {
        url: String,
        attempts: u32,
        cause: FetchFailure,
    },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch exhaustion error.
    pub fn fetch(url: impl Into<String>, attempts: u32, cause: FetchFailure) -> Self {
        Self::Fetch {
            url: url.into(),
            attempts,
            cause,
        }
    }
}

/// Why a single fetch attempt did not yield a usable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Transport-level failure (connect, reset, body read)
    Network(String),
    /// The per-attempt timeout elapsed
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// 200 response whose body carries an anti-automation marker
    SoftBlock(String),
    /// The request could not be built, e.g. an unparsable URL
    InvalidRequest(String),
}

impl FetchFailure {
    /// Whether another attempt may succeed, given the configured transient statuses.
    pub fn is_retryable(&self, retry_statuses: &[u16]) -> bool {
        match self {
            FetchFailure::Network(_) | FetchFailure::Timeout | FetchFailure::SoftBlock(_) => true,
            FetchFailure::Status(code) => retry_statuses.contains(code),
            FetchFailure::InvalidRequest(_) => false,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Network(message) => write!(f, "network error: {message}"),
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::Status(code) => write!(f, "status={code}"),
            FetchFailure::SoftBlock(marker) => write!(f, "blocked (matched \"{marker}\")"),
            FetchFailure::InvalidRequest(message) => write!(f, "invalid request: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSIENT: [u16; 5] = [429, 500, 502, 503, 504];

    #[test]
    fn test_soft_block_is_retryable() {
        assert!(FetchFailure::SoftBlock("captcha".into()).is_retryable(&TRANSIENT));
        assert!(FetchFailure::Timeout.is_retryable(&TRANSIENT));
    }

    #[test]
    fn test_status_retry_follows_configured_set() {
        assert!(FetchFailure::Status(503).is_retryable(&TRANSIENT));
        assert!(!FetchFailure::Status(404).is_retryable(&TRANSIENT));
    }

    #[test]
    fn test_invalid_request_is_final() {
        assert!(!FetchFailure::InvalidRequest("relative URL".into()).is_retryable(&TRANSIENT));
    }

    #[test]
    fn test_fetch_error_message() {
        let err = AppError::fetch("https://example.com", 3, FetchFailure::Status(503));
        assert_eq!(
            err.to_string(),
            "Failed to fetch https://example.com after 3 attempt(s): status=503"
        );
    }
}
