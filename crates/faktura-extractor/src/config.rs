//! Configuration for the Extractor

use faktura_domain::GenerationParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when a critique or repair step cannot produce usable JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueFailurePolicy {
    /// Record the failed pass and carry on with the current payload
    KeepCurrent,
    /// End the run with the failure
    Abort,
}

impl Default for CritiqueFailurePolicy {
    fn default() -> Self {
        CritiqueFailurePolicy::KeepCurrent
    }
}

/// Configuration for the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Outer attempts for JSON generation
    pub max_json_retries: u32,

    /// Critique passes after the first validation (0 disables critique)
    pub max_critique_passes: u32,

    /// Attempts per critique pass to obtain a parsable verdict
    pub max_critique_retries: u32,

    /// Maximum time for a single generation call (seconds)
    pub generation_timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Generated token cap per call
    pub max_tokens: u32,

    /// Kind of document named in prompts ("invoice", "receipt", ...)
    pub document_kind: String,

    /// Handling of critique and repair failures
    pub critique_failure_policy: CritiqueFailurePolicy,

    /// Fail the run when the final payload is not schema-valid
    pub require_valid_output: bool,

    /// Maximum normalized input length (characters)
    pub max_text_length: usize,
}

impl ExtractorConfig {
    /// Get the generation timeout as a Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Decoding parameters for every provider call
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::new(self.temperature, self.max_tokens)
    }

    /// Whether the critique loop runs at all
    pub fn critique_enabled(&self) -> bool {
        self.max_critique_passes > 0
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_json_retries == 0 {
            return Err("max_json_retries must be at least 1".to_string());
        }
        if self.critique_enabled() && self.max_critique_retries == 0 {
            return Err(
                "max_critique_retries must be at least 1 when critique passes are enabled"
                    .to_string(),
            );
        }
        if self.generation_timeout_secs == 0 {
            return Err("generation_timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within [0.0, 2.0], got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.document_kind.trim().is_empty() {
            return Err("document_kind must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_json_retries: 3,
            max_critique_passes: 2,
            max_critique_retries: 2,
            generation_timeout_secs: 120,
            temperature: 0.0,
            max_tokens: 768,
            document_kind: "invoice".to_string(),
            critique_failure_policy: CritiqueFailurePolicy::KeepCurrent,
            require_valid_output: false,
            max_text_length: 200_000,
        }
    }
}

impl ExtractorConfig {
    /// Fast preset: generate and validate only, fewer retries
    pub fn fast() -> Self {
        Self {
            max_json_retries: 2,
            max_critique_passes: 0,
            max_critique_retries: 0,
            generation_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Thorough preset: more critique passes and retries
    pub fn thorough() -> Self {
        Self {
            max_json_retries: 3,
            max_critique_passes: 3,
            max_critique_retries: 3,
            generation_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
