//! Error types for the Extractor

use faktura_domain::CritiqueAction;
use thiserror::Error;

/// Errors that can end a pipeline run
///
/// Terminal failures carry the last raw model output and the last structured
/// error so a caller can decide between retrying the run and escalating to a
/// human without re-deriving state.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The generation provider failed or was unreachable
    #[error("Transport error: {0}")]
    Transport(String),

    /// A generation call exceeded its time budget
    #[error("Generation timeout")]
    Timeout,

    /// No parsable JSON object within the attempt budget
    #[error("No parsable JSON object after {attempts} attempts: {last_error}")]
    ExtractionFailure {
        /// Attempts made
        attempts: u32,
        /// Raw text of the last generation
        last_raw: String,
        /// Last extraction or parse error
        last_error: String,
    },

    /// Final payload does not conform to the schema (strict mode only)
    #[error("Schema validation failed: {message}")]
    SchemaValidation {
        /// First violation, `<path>: <error>`
        message: String,
    },

    /// No parsable critique verdict within the critique retry budget
    #[error("No parsable critique verdict after {attempts} attempts: {last_error}")]
    CritiqueFailure {
        /// Attempts made
        attempts: u32,
        /// Raw text of the last critique generation
        last_raw: String,
        /// Last extraction or parse error
        last_error: String,
    },

    /// A fix or regenerate call did not return a usable payload
    #[error("{action} step did not return a JSON object: {reason}")]
    RepairFailure {
        /// Repair that was attempted
        action: CritiqueAction,
        /// Raw text returned by the repair call
        last_raw: String,
        /// Extraction or parse error
        reason: String,
    },

    /// The run was cancelled between stages
    #[error("Run cancelled")]
    Cancelled,

    /// Input text was rejected before any generation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema could not be loaded or compiled
    #[error("Schema error: {0}")]
    Schema(#[from] faktura_gatekeeper::GatekeeperError),
}

impl ExtractorError {
    /// Last raw model output, for failures that have one
    pub fn last_raw(&self) -> Option<&str> {
        match self {
            ExtractorError::ExtractionFailure { last_raw, .. }
            | ExtractorError::CritiqueFailure { last_raw, .. }
            | ExtractorError::RepairFailure { last_raw, .. } => Some(last_raw),
            _ => None,
        }
    }
}
