//! Error types for batch background removal

use thiserror::Error;

/// Result type alias for batch background removal operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Error types raised while discovering, fetching, processing and storing items
#[derive(Error, Debug)]
pub enum BatchError {
    /// A required credential or setting is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The storage gateway returned no retrievable body for an object
    #[error("Failed to fetch '{key}': {reason}")]
    Fetch { key: String, reason: String },

    /// The removal API answered with a non-success, non-rate-limit status
    ///
    /// `message` is the API's own error title when the body carries one,
    /// otherwise the body text; `body` always holds the raw response body.
    #[error("Removal API error {status} {status_text}: {message}")]
    Api {
        status: u16,
        status_text: String,
        message: String,
        body: String,
    },

    /// Every permitted attempt was rate limited
    #[error("Removal API still rate limited after {attempts} attempt(s)")]
    RetryExhausted { attempts: u32 },

    /// Listing or other storage gateway failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport failures talking to the removal API
    #[error("Network error: {0}")]
    Network(String),

    /// Local filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a fetch error for a specific object key
    pub fn fetch<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::Fetch {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error with operation context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Whether this error must abort the whole batch rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
