//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error
    #[error(transparent)]
    Extractor(#[from] faktura_extractor::ExtractorError),

    /// Document conversion error
    #[error(transparent)]
    Convert(#[from] faktura_convert::ConvertError),

    /// Generation provider setup error
    #[error("Provider error: {0}")]
    Llm(#[from] faktura_llm::LlmError),

    /// Schema loading error
    #[error("Schema error: {0}")]
    Schema(#[from] faktura_gatekeeper::GatekeeperError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Interrupted by Ctrl-C
    #[error("Interrupted")]
    Interrupted,
}
