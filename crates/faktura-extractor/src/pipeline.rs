//! Pipeline orchestrator and JSON generation stage

use crate::cancel::CancelToken;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{parse_object, JsonError};
use crate::prompt::PromptBuilder;
use crate::types::{ExtractionReport, Payload, PayloadRevision, PayloadSource};
use faktura_domain::traits::LlmProvider;
use faktura_domain::{DocumentText, RunId};
use faktura_gatekeeper::Gatekeeper;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

/// Turns document text into a schema-conformant JSON payload
///
/// Holds only immutable state, so one `Pipeline` can serve many concurrent
/// runs. Each run is strictly sequential: generate, validate, then critique
/// and repair for up to `max_critique_passes` passes.
pub struct Pipeline<L>
where
    L: LlmProvider,
{
    pub(crate) llm_provider: Arc<L>,
    pub(crate) gatekeeper: Arc<Gatekeeper>,
    pub(crate) config: ExtractorConfig,
    pub(crate) prompts: PromptBuilder,
    model_name: String,
}

/// Payload obtained by the generation stage
pub(crate) struct Generated {
    pub(crate) payload: Payload,
    pub(crate) attempts: u32,
}

impl<L> Pipeline<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new Pipeline
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration does not validate.
    pub fn new(
        llm_provider: L,
        gatekeeper: Arc<Gatekeeper>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let model_name = llm_provider.model_name().to_string();
        let prompts = PromptBuilder::new(config.document_kind.clone());

        Ok(Self {
            llm_provider: Arc::new(llm_provider),
            gatekeeper,
            config,
            prompts,
            model_name,
        })
    }

    /// Override the model name reported in run reports
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Gatekeeper holding the target schema
    pub fn gatekeeper(&self) -> &Arc<Gatekeeper> {
        &self.gatekeeper
    }

    /// Run the pipeline on raw document text
    pub async fn run(&self, raw_text: &str) -> Result<ExtractionReport, ExtractorError> {
        self.run_with_cancel(raw_text, &CancelToken::new()).await
    }

    /// Run the pipeline on raw bytes, which must be UTF-8
    pub async fn run_bytes(&self, raw: &[u8]) -> Result<ExtractionReport, ExtractorError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ExtractorError::InvalidInput(format!("input is not valid UTF-8: {}", e)))?;
        self.run(text).await
    }

    /// Run the pipeline, checking `cancel` between stages and provider calls
    pub async fn run_with_cancel(
        &self,
        raw_text: &str,
        cancel: &CancelToken,
    ) -> Result<ExtractionReport, ExtractorError> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run_id = %run_id, model = %self.model_name);

        self.execute(run_id, raw_text, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: RunId,
        raw_text: &str,
        cancel: &CancelToken,
    ) -> Result<ExtractionReport, ExtractorError> {
        let start_time = Instant::now();
        cancel.check()?;

        let text = DocumentText::normalize(raw_text);
        if text.is_empty() {
            return Err(ExtractorError::InvalidInput(
                "document text is empty".to_string(),
            ));
        }
        let char_count = text.char_count();
        if char_count > self.config.max_text_length {
            return Err(ExtractorError::InvalidInput(format!(
                "text too long: {} chars (max: {})",
                char_count, self.config.max_text_length
            )));
        }

        info!("Starting extraction, text length {} chars", char_count);

        let generated = self.generate_with_retries(&text, cancel).await?;
        let mut payload = generated.payload;
        let mut revisions = vec![PayloadRevision {
            source: PayloadSource::Generated,
            pass: 0,
            payload: payload.clone(),
        }];

        cancel.check()?;
        let initial_validation = self.gatekeeper.validate(&payload);
        match &initial_validation.message {
            None => info!("Payload passes schema validation on first pass"),
            Some(message) => warn!("Schema validation failed on first pass: {}", message),
        }

        let mut accepted = false;
        let mut passes = Vec::new();
        let mut final_validation = initial_validation.clone();

        if self.config.critique_enabled() {
            let outcome = self.critique_loop(&text, payload, cancel).await?;
            payload = outcome.payload;
            accepted = outcome.accepted;
            passes = outcome.passes;
            revisions.extend(outcome.revisions);
            if let Some(validation) = outcome.last_validation {
                final_validation = validation;
            }
        }

        if self.config.require_valid_output && !final_validation.valid {
            return Err(ExtractorError::SchemaValidation {
                message: final_validation
                    .message
                    .clone()
                    .unwrap_or_else(|| "payload does not conform to schema".to_string()),
            });
        }

        let report = ExtractionReport {
            run_id,
            payload,
            accepted,
            initial_validation,
            final_validation,
            generation_attempts: generated.attempts,
            passes,
            revisions,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
            model_name: self.model_name.clone(),
        };

        info!("Extraction complete: {}", report.summary());

        Ok(report)
    }

    /// Obtain a parsable JSON object within `max_json_retries` attempts
    ///
    /// Every attempt sends the same extraction prompt. If the answer holds no
    /// JSON object at all, one format-repair call follows within the same
    /// attempt. Schema conformance is not checked here.
    pub(crate) async fn generate_with_retries(
        &self,
        text: &DocumentText,
        cancel: &CancelToken,
    ) -> Result<Generated, ExtractorError> {
        let schema_text = self.gatekeeper.schema().text();
        let prompt = self.prompts.extraction(text, schema_text);
        let max_attempts = self.config.max_json_retries;

        debug!("Extraction prompt length: {} chars", prompt.len());

        let mut last_raw = String::new();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let raw = self.call_llm(&prompt, cancel).await?;
            debug!("Generation attempt {} returned {} chars", attempt, raw.len());

            let result = match parse_object(&raw) {
                Err(JsonError::NoObject) => {
                    warn!("Attempt {}: no JSON object in output, requesting reformat", attempt);
                    let repair_prompt = self.prompts.repair_format(schema_text, &raw);
                    let repaired = self.call_llm(&repair_prompt, cancel).await?;
                    let result = parse_object(&repaired);
                    last_raw = repaired;
                    result
                }
                other => {
                    last_raw = raw;
                    other
                }
            };

            match result {
                Ok(payload) => {
                    info!("Obtained JSON payload on attempt {}", attempt);
                    return Ok(Generated {
                        payload,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(ExtractorError::ExtractionFailure {
            attempts: max_attempts,
            last_raw,
            last_error,
        })
    }

    /// Call the generation provider on the blocking pool, under the timeout
    pub(crate) async fn call_llm(
        &self,
        prompt: &str,
        cancel: &CancelToken,
    ) -> Result<String, ExtractorError> {
        cancel.check()?;

        let llm = Arc::clone(&self.llm_provider);
        let prompt = prompt.to_string();
        let params = self.config.generation_params();

        // Call in a blocking context since LlmProvider is not async
        let task = tokio::task::spawn_blocking(move || {
            llm.generate(&prompt, &params)
                .map_err(|e| ExtractorError::Transport(e.to_string()))
        });

        timeout(self.config.generation_timeout(), task)
            .await
            .map_err(|_| ExtractorError::Timeout)?
            .map_err(|e| ExtractorError::Transport(format!("Task join error: {}", e)))?
    }
}
