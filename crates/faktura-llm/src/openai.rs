//! OpenAI-compatible chat completions provider
//!
//! Talks to any endpoint implementing `POST {base_url}/chat/completions`.
//! The default target is the Hugging Face inference router serving a Llama 3
//! instruct model.
//!
//! # Features
//!
//! - Fixed system instruction asking for a single JSON object
//! - Bearer token authentication
//! - Retry with exponential backoff for connection errors and 5xx responses
//! - Per-request timeout
//!
//! # Examples
//!
//! ```no_run
//! use faktura_llm::{OpenAiConfig, OpenAiProvider};
//!
//! let config = OpenAiConfig::default().with_api_key("hf_xxx");
//! let provider = OpenAiProvider::new(config).unwrap();
//! // The async `chat` method is available directly; the `LlmProvider`
//! // trait offers a blocking wrapper for use from worker threads.
//! ```

use crate::LlmError;
use faktura_domain::traits::LlmProvider as LlmProviderTrait;
use faktura_domain::GenerationParams;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL (Hugging Face router, OpenAI-compatible)
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct:novita";

/// Default timeout for a single request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of request attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// System message sent ahead of every prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a careful, deterministic JSON-producing assistant. \
When asked for JSON, respond with a single valid JSON object and nothing else.";

/// Connection settings for [`OpenAiProvider`]
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Bearer token
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per call for retryable failures
    pub max_retries: u32,

    /// First backoff delay; doubles after every failed attempt
    pub retry_base_delay_ms: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: 1000,
        }
    }
}

impl OpenAiConfig {
    /// Set the bearer token
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Longest a single `chat` call can take: every attempt timing out,
    /// plus the backoff sleeps between attempts
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.max_retries.max(1);
        let requests = Duration::from_secs(self.timeout_secs).saturating_mul(attempts);
        let backoff_ms = (0..attempts - 1).fold(0u64, |total, k| {
            total.saturating_add(self.retry_base_delay_ms.saturating_mul(2u64.saturating_pow(k)))
        });
        requests.saturating_add(Duration::from_millis(backoff_ms))
    }
}

/// Chat completions provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider from connection settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Connection settings in use
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one prompt and return the first choice's content
    ///
    /// A missing `content` field yields an empty string; it is the caller's
    /// job to decide whether that is usable.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for 401/403
    /// - `ModelNotAvailable` for 404
    /// - `RateLimitExceeded` for 429
    /// - `InvalidResponse` for malformed bodies or an empty `choices` list
    /// - `Communication` once retries for connection errors and 5xx are spent
    pub async fn chat(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let url = self.endpoint();
        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            let mut request = self.client.post(&url).json(&request_body);
            if let Some(key) = self.config.api_key.as_deref() {
                if !key.trim().is_empty() {
                    request = request.bearer_auth(key.trim());
                }
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to read body: {}", e))
                        })?;
                        debug!(bytes = body.len(), "Chat completion received");
                        return parse_chat_response(&body);
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    match status {
                        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                            return Err(LlmError::Unauthorized(format!("HTTP {}", status)));
                        }
                        reqwest::StatusCode::NOT_FOUND => {
                            return Err(LlmError::ModelNotAvailable(self.config.model.clone()));
                        }
                        reqwest::StatusCode::TOO_MANY_REQUESTS => {
                            return Err(LlmError::RateLimitExceeded);
                        }
                        s if s.is_server_error() => {
                            last_error = Some(LlmError::Communication(format!(
                                "HTTP {}: {}",
                                status, error_text
                            )));
                        }
                        _ => {
                            return Err(LlmError::Communication(format!(
                                "HTTP {}: {}",
                                status, error_text
                            )));
                        }
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < max_attempts {
                let delay = Duration::from_millis(
                    self.config.retry_base_delay_ms * 2u64.pow(attempts - 1),
                );
                warn!(attempt = attempts, ?delay, "Chat completion failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

fn parse_chat_response(body: &str) -> Result<String, LlmError> {
    let chat: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let choice = chat
        .choices
        .and_then(|choices| choices.into_iter().next())
        .ok_or_else(|| LlmError::InvalidResponse("No choices in API response".to_string()))?;

    Ok(choice.message.content.unwrap_or_default())
}

/// Drive a future to completion from synchronous code
///
/// Reuses the ambient runtime when called from one of its blocking threads,
/// otherwise spins up a single-threaded runtime for the call.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, LlmError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?;
            Ok(runtime.block_on(future))
        }
    }
}

impl LlmProviderTrait for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, Self::Error> {
        block_on(self.chat(prompt, params))?
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
