//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and the services
//! it depends on. Implementations live in infrastructure crates and are
//! swapped for scripted mocks in tests.

use crate::GenerationParams;

/// Trait for text generation
///
/// Implemented by the infrastructure layer (faktura-llm). One call is one
/// independent request: no conversation state is carried between calls.
pub trait LlmProvider {
    /// Error type for generation failures
    type Error;

    /// Send a prompt and return the raw generated text
    ///
    /// An empty string is a valid answer and is not an error.
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, Self::Error>;

    /// Model name reported in run summaries
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Opaque handle for a submitted conversion job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wrap a service-issued job identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a conversion job as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    /// Still being processed (any non-terminal service status)
    Pending(String),

    /// Text is ready for retrieval
    Processed,

    /// The service gave up on the job
    Failed(String),
}

impl ConversionStatus {
    /// True for `Processed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversionStatus::Pending(_))
    }
}

/// Trait for converting binary documents into plain text
///
/// Implemented by the infrastructure layer (faktura-convert). Conversion is
/// asynchronous on the service side: submit, poll until terminal, retrieve.
pub trait DocumentConverter {
    /// Error type for conversion failures
    type Error;

    /// Upload a document and start a conversion job
    fn submit(&self, bytes: &[u8], filename: &str) -> Result<JobHandle, Self::Error>;

    /// Ask the service where a job stands
    fn poll_status(&self, job: &JobHandle) -> Result<ConversionStatus, Self::Error>;

    /// Fetch the text of a processed job
    fn retrieve(&self, job: &JobHandle) -> Result<String, Self::Error>;
}
