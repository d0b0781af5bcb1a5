//! texdraft Common Error Types
//!
//! Centralized error handling for all texdraft components

use std::fmt;

/// Main error type for texdraft operations
#[derive(Debug)]
pub enum TexdraftError {
    /// Generic error with message
    Generic(String),
    /// IO-related errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(serde_json::Error),
    /// Configuration errors (unregistered role, bad environment value).
    /// Never retried.
    Config(String),
    /// Upstream model stream failed; terminal for the current run
    Transport(String),
    /// A streamed unit did not have the expected shape
    Validation(String),
    /// An edit transaction addressed an invalid range
    Edit(String),
}

impl TexdraftError {
    /// Whether this error ends the process-level setup rather than a single run
    pub fn is_config(&self) -> bool {
        matches!(self, TexdraftError::Config(_))
    }
}

impl fmt::Display for TexdraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TexdraftError::Generic(msg) => write!(f, "texdraft error: {}", msg),
            TexdraftError::Io(err) => write!(f, "IO error: {}", err),
            TexdraftError::Serde(err) => write!(f, "Serialization error: {}", err),
            TexdraftError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TexdraftError::Transport(msg) => write!(f, "Model transport error: {}", msg),
            TexdraftError::Validation(msg) => write!(f, "Validation error: {}", msg),
            TexdraftError::Edit(msg) => write!(f, "Edit error: {}", msg),
        }
    }
}

impl std::error::Error for TexdraftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TexdraftError::Io(err) => Some(err),
            TexdraftError::Serde(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience result type for texdraft operations
pub type Result<T> = std::result::Result<T, TexdraftError>;

impl From<std::io::Error> for TexdraftError {
    fn from(err: std::io::Error) -> Self {
        TexdraftError::Io(err)
    }
}

impl From<serde_json::Error> for TexdraftError {
    fn from(err: serde_json::Error) -> Self {
        TexdraftError::Serde(err)
    }
}

impl From<anyhow::Error> for TexdraftError {
    fn from(err: anyhow::Error) -> Self {
        TexdraftError::Generic(err.to_string())
    }
}
