//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur while loading or compiling a schema
///
/// A payload failing validation is not an error; see `ValidationResult`.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Schema file could not be read
    #[error("Failed to read schema {path}: {source}")]
    Io {
        /// Path that was requested
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Schema text is not JSON
    #[error("Schema is not valid JSON: {0}")]
    Parse(String),

    /// Schema is JSON but not a usable JSON Schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}
