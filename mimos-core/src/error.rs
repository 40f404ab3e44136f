//! Error types for replay operations

/// Result type for replay operations
pub type Result<T> = std::result::Result<T, MimosError>;

/// Error types for the Mimos replay engine
#[derive(Debug, thiserror::Error)]
pub enum MimosError {
    /// Scenario file does not exist
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    /// Scenario file is not valid JSON
    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    /// Scenario content matches neither recognized schema shape
    #[error("Invalid scenario: {0}")]
    ScenarioValidation(String),

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

impl From<String> for MimosError {
    fn from(s: String) -> Self {
        MimosError::Other(s)
    }
}

impl From<&str> for MimosError {
    fn from(s: &str) -> Self {
        MimosError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for MimosError {
    fn from(err: anyhow::Error) -> Self {
        MimosError::Other(err.to_string())
    }
}
