//! Configuration for document conversion
//!
//! Connection settings for the conversion service and the bounds on how long
//! we wait for a job.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default base URL of the conversion service
pub const DEFAULT_WHISPERER_URL: &str = "https://llmwhisperer-api.us-central.unstract.com/api/v2";

/// Bounds on waiting for a conversion job
///
/// # Examples
///
/// ```
/// use faktura_convert::PollConfig;
///
/// let config = PollConfig::default();
/// assert_eq!(config.poll_interval_secs, 5);
/// assert_eq!(config.max_polls, 60);
///
/// // Back off exponentially, never waiting more than 30s between checks
/// let config = PollConfig::with_backoff();
/// assert!(config.backoff);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Wait before each status check (in seconds)
    /// Default: 5
    pub poll_interval_secs: u64,

    /// Status checks before giving up
    /// Default: 60 (five minutes at the default interval)
    pub max_polls: u32,

    /// Double the wait after every check
    /// Default: false
    pub backoff: bool,

    /// Upper bound on a single wait when backing off (in seconds)
    /// Default: 30
    pub max_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_polls: 60,
            backoff: false,
            max_interval_secs: 30,
        }
    }
}

impl PollConfig {
    /// Exponential backoff from 2s, capped at 30s, for up to 40 checks
    pub fn with_backoff() -> Self {
        Self {
            poll_interval_secs: 2,
            max_polls: 40,
            backoff: true,
            max_interval_secs: 30,
        }
    }

    /// Wait before the given 1-based status check
    pub fn interval_for(&self, poll: u32) -> Duration {
        if !self.backoff {
            return Duration::from_secs(self.poll_interval_secs);
        }
        let exponent = poll.saturating_sub(1).min(16);
        let secs = self
            .poll_interval_secs
            .saturating_mul(1u64 << exponent)
            .min(self.max_interval_secs);
        Duration::from_secs(secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_polls == 0 {
            return Err("max_polls must be at least 1".to_string());
        }
        if self.backoff && self.max_interval_secs < self.poll_interval_secs {
            return Err(format!(
                "max_interval_secs ({}) must not be below poll_interval_secs ({})",
                self.max_interval_secs, self.poll_interval_secs
            ));
        }
        Ok(())
    }
}

/// Connection settings for an LLMWhisperer-style conversion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhispererConfig {
    /// API base URL, without a trailing `/whisper`
    pub base_url: String,

    /// Value of the `unstract-key` header
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Processing mode ("high_quality", "form", "low_cost", "native_text")
    pub mode: String,

    /// Output layout ("text" or "layout_preserving")
    pub output_mode: String,

    /// Per-request timeout (in seconds)
    pub timeout_secs: u64,
}

impl Default for WhispererConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WHISPERER_URL.to_string(),
            api_key: None,
            mode: "high_quality".to_string(),
            output_mode: "text".to_string(),
            timeout_secs: 120,
        }
    }
}

impl WhispererConfig {
    /// Create a configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the processing mode
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the output mode
    pub fn with_output_mode(mut self, output_mode: impl Into<String>) -> Self {
        self.output_mode = output_mode.into();
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
