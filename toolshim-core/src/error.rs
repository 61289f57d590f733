//! Error types for Toolshim operations

use crate::external::SpecError;
use crate::tools::RegistryError;

/// Result type for Toolshim operations
pub type Result<T> = std::result::Result<T, ToolshimError>;

/// Error types for the Toolshim crate
#[derive(Debug, thiserror::Error)]
pub enum ToolshimError {
    /// A tool specification failed validation
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Registry operation failed
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ToolshimError {
    fn from(s: String) -> Self {
        ToolshimError::Other(s)
    }
}

impl From<&str> for ToolshimError {
    fn from(s: &str) -> Self {
        ToolshimError::Other(s.to_string())
    }
}

impl From<figment::Error> for ToolshimError {
    fn from(err: figment::Error) -> Self {
        ToolshimError::Configuration(err.to_string())
    }
}
