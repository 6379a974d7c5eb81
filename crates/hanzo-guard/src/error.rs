//! Error types for Hanzo Guard

use thiserror::Error;

/// Result type alias for Guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard error types
#[derive(Debug, Error)]
pub enum GuardError {
    /// The external classifier failed or returned nothing usable
    #[error("Classifier error: {0}")]
    ClassifierError(String),

    /// Evaluation did not finish in time
    #[error("Evaluation timed out after {0} ms")]
    Timeout(u64),

    /// A blocking task panicked or was cancelled
    #[error("Evaluation task failed: {0}")]
    TaskFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for GuardError {
    fn from(err: tokio::task::JoinError) -> Self {
        GuardError::TaskFailed(err.to_string())
    }
}
