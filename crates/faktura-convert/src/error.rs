//! Error types for document conversion

use thiserror::Error;

/// Errors that can occur while converting a document to text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// HTTP or connection failure talking to the conversion service
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service reported the job as failed
    #[error("Conversion job failed: {0}")]
    JobFailed(String),

    /// The job did not finish within the polling budget
    #[error("Conversion did not finish after {polls} status checks")]
    Timeout {
        /// Number of status checks performed
        polls: u32,
    },

    /// The service answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
