//! Error types for hrbot

use thiserror::Error;

/// Result type alias for hrbot operations
pub type Result<T> = std::result::Result<T, HrBotError>;

/// Main error type for hrbot
///
/// Classification itself never fails; these errors come from construction-time
/// validation and from the collaborators (catalog loading, usage recording).
#[derive(Error, Debug)]
pub enum HrBotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed record in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Classification timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HrBotError {
    /// Check if the error came from a collaborator and can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, HrBotError::Io(_) | HrBotError::Timeout(_))
    }

    /// Get a stable short code, used by the CLI's JSON output
    pub fn code(&self) -> &'static str {
        match self {
            HrBotError::Io(_) => "io",
            HrBotError::Serialization(_) => "serialization",
            HrBotError::ConfigParse(_) | HrBotError::Config(_) => "config",
            HrBotError::InvalidInput(_) => "invalid_input",
            HrBotError::Parse { .. } => "parse",
            HrBotError::Timeout(_) => "timeout",
            HrBotError::Internal(_) => "internal",
        }
    }
}
