//! Custom error types for rustpubmed.
//!
//! All library functions return `Result<T, PubmedError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for rustpubmed operations.
#[derive(Debug, Error)]
pub enum PubmedError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Record did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed XML from EFetch
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Rate limited by E-utilities
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// E-utilities returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status, or 0 when the error came in the response body
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `PubmedError`
pub type Result<T> = std::result::Result<T, PubmedError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PubmedError::Parse(msg.to_string()))
    }
}
