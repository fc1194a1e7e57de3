//! Faktura LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `faktura-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted provider for testing
//! - `OpenAiProvider`: OpenAI-compatible chat completions (Hugging Face router by default)
//!
//! # Examples
//!
//! ```
//! use faktura_llm::MockProvider;
//! use faktura_domain::{traits::LlmProvider, GenerationParams};
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt", &GenerationParams::default()).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod openai;

use faktura_domain::traits::LlmProvider as LlmProviderTrait;
use faktura_domain::GenerationParams;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use openai::{OpenAiConfig, OpenAiProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// API key missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One scripted reply
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(LlmError),
}

impl MockReply {
    fn into_result(self) -> Result<String, LlmError> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(err) => Err(err),
        }
    }
}

/// Replies for prompts containing a marker; the last reply repeats
#[derive(Debug)]
struct MarkerRule {
    marker: String,
    replies: VecDeque<MockReply>,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<MarkerRule>,
    queue: VecDeque<MockReply>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are resolved in this order:
///
/// 1. the first marker rule whose marker occurs in the prompt
/// 2. the FIFO queue
/// 3. the default response
///
/// A rule with several replies hands them out in order and then keeps
/// repeating its last one. Clones share state, so a test can keep a handle
/// while the pipeline owns another.
///
/// # Examples
///
/// ```
/// use faktura_llm::MockProvider;
/// use faktura_domain::{traits::LlmProvider, GenerationParams};
///
/// let params = GenerationParams::default();
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt", &params).unwrap(), "Fixed response");
///
/// // Marker rules and a queue
/// let provider = MockProvider::default();
/// provider.add_rule("auditor", "{\"valid\": true}");
/// provider.push_response("first");
/// provider.push_response("second");
/// assert_eq!(provider.generate("you are an auditor", &params).unwrap(), "{\"valid\": true}");
/// assert_eq!(provider.generate("anything", &params).unwrap(), "first");
/// assert_eq!(provider.generate("anything", &params).unwrap(), "second");
/// assert_eq!(provider.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model_name: String,
    state: Arc<Mutex<MockState>>,
    call_count: Arc<Mutex<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model_name: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Override the reported model name
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Reply with `response` whenever the prompt contains `marker`
    ///
    /// Calling this again with the same marker appends another reply to
    /// that rule instead of creating a new one.
    pub fn add_rule(&self, marker: impl Into<String>, response: impl Into<String>) {
        self.push_rule_reply(marker.into(), MockReply::Text(response.into()));
    }

    /// Fail with a communication error whenever the prompt contains `marker`
    pub fn add_error(&self, marker: impl Into<String>) {
        self.push_rule_reply(
            marker.into(),
            MockReply::Error(LlmError::Communication("Mock error".to_string())),
        );
    }

    fn push_rule_reply(&self, marker: String, reply: MockReply) {
        let mut state = lock(&self.state);
        match state.rules.iter_mut().find(|rule| rule.marker == marker) {
            Some(rule) => rule.replies.push_back(reply),
            None => state.rules.push(MarkerRule {
                marker,
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Queue a response for the next unmatched call
    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.state)
            .queue
            .push_back(MockReply::Text(response.into()));
    }

    /// Queue a specific error for the next unmatched call
    pub fn push_error(&self, error: LlmError) {
        lock(&self.state).queue.push_back(MockReply::Error(error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    /// All prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.state).prompts.clone()
    }

    /// Number of received prompts containing `marker`
    pub fn calls_matching(&self, marker: &str) -> usize {
        lock(&self.state)
            .prompts
            .iter()
            .filter(|prompt| prompt.contains(marker))
            .count()
    }

    /// Number of queued replies not yet consumed
    pub fn pending_responses(&self) -> usize {
        lock(&self.state).queue.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, Self::Error> {
        *lock(&self.call_count) += 1;

        let mut state = lock(&self.state);
        state.prompts.push(prompt.to_string());

        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|rule| prompt.contains(rule.marker.as_str()))
        {
            let reply = if rule.replies.len() > 1 {
                rule.replies.pop_front()
            } else {
                rule.replies.front().cloned()
            };
            if let Some(reply) = reply {
                return reply.into_result();
            }
        }

        if let Some(reply) = state.queue.pop_front() {
            return reply.into_result();
        }

        Ok(self.default_response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
