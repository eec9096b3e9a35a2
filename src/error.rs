//! Error types for hlc_relay

use thiserror::Error;

/// Result type alias for hlc_relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hlc_relay operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clock drift: {millis} is {drift}ms away from physical time (max {max_drift}ms)")]
    ClockDrift {
        millis: u64,
        drift: u64,
        max_drift: u64,
    },

    #[error("Timestamp counter overflow at {millis}")]
    Overflow { millis: u64 },

    #[error("Received a timestamp from our own node: {0}")]
    DuplicateNode(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Message for group '{found}' submitted to group '{expected}'")]
    GroupMismatch { expected: String, found: String },

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Sync did not converge: fork point {0} repeated")]
    NotConverging(u64),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was caused by bad input rather than a failing backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidTimestamp(_)
                | Error::InvalidNodeId(_)
                | Error::InvalidValue(_)
                | Error::GroupMismatch { .. }
                | Error::Json(_)
        )
    }
}
