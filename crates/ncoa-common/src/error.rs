//! Error types for the NCOA pipeline

use thiserror::Error;

/// Result type alias for NCOA pipeline operations
pub type Result<T> = std::result::Result<T, NcoaError>;

/// Main error type for the NCOA pipeline
///
/// Every variant is fatal: the run aborts and must be re-triggered
/// externally. There is no retry or partial-success path.
#[derive(Error, Debug)]
pub enum NcoaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Warehouse error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Job deadline of {0}s exceeded")]
    DeadlineExceeded(u64),
}

impl NcoaError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}
