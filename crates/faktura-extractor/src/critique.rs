//! Critique and repair stage

use crate::cancel::CancelToken;
use crate::config::CritiqueFailurePolicy;
use crate::error::ExtractorError;
use crate::parser::{parse_object, parse_verdict, JsonError};
use crate::pipeline::Pipeline;
use crate::types::{
    CritiquePassRecord, CritiqueVerdict, PassOutcome, Payload, PayloadRevision, PayloadSource,
};
use faktura_domain::traits::LlmProvider;
use faktura_domain::{CritiqueAction, DocumentText};
use faktura_gatekeeper::ValidationResult;
use tracing::{debug, info, warn};

/// State handed back to the orchestrator after the critique loop
pub(crate) struct CritiqueOutcome {
    pub(crate) payload: Payload,
    pub(crate) accepted: bool,
    pub(crate) passes: Vec<CritiquePassRecord>,
    pub(crate) revisions: Vec<PayloadRevision>,
    pub(crate) last_validation: Option<ValidationResult>,
}

impl<L> Pipeline<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Audit and repair the payload for up to `max_critique_passes` passes
    ///
    /// Stops early only on an explicit accept. A repaired payload that still
    /// fails validation is reported, not retried beyond the pass budget.
    pub(crate) async fn critique_loop(
        &self,
        text: &DocumentText,
        mut payload: Payload,
        cancel: &CancelToken,
    ) -> Result<CritiqueOutcome, ExtractorError> {
        let max_passes = self.config.max_critique_passes;
        let policy = self.config.critique_failure_policy;

        let mut accepted = false;
        let mut passes = Vec::new();
        let mut revisions = Vec::new();
        let mut last_validation = None;

        for pass in 1..=max_passes {
            cancel.check()?;

            let verdict = match self.critique(text, &payload, cancel).await {
                Ok(verdict) => verdict,
                Err(e @ ExtractorError::CritiqueFailure { .. }) => {
                    if policy == CritiqueFailurePolicy::Abort {
                        return Err(e);
                    }
                    warn!("Critique pass {} failed, keeping current payload: {}", pass, e);
                    passes.push(CritiquePassRecord {
                        pass,
                        action: None,
                        severity: None,
                        issue_count: 0,
                        outcome: PassOutcome::CritiqueFailed(e.to_string()),
                        validation: None,
                    });
                    break;
                }
                Err(e) => return Err(e),
            };

            let action = verdict.decision();
            info!(
                "Critique pass {}: valid={}, severity={}, {} issue(s), action={}",
                pass,
                verdict.valid,
                verdict.severity,
                verdict.issues.len(),
                action
            );

            let mut record = CritiquePassRecord {
                pass,
                action: Some(action),
                severity: Some(verdict.severity),
                issue_count: verdict.issues.len(),
                outcome: PassOutcome::Accepted,
                validation: None,
            };

            if action == CritiqueAction::Accept {
                info!("Critique accepted the payload");
                accepted = true;
                passes.push(record);
                break;
            }

            match self.repair(text, &payload, &verdict, action, cancel).await {
                Ok(repaired) => {
                    let validation = self.gatekeeper.validate(&repaired);
                    match &validation.message {
                        None => info!("Payload passes schema validation after {}", action),
                        Some(message) => {
                            warn!("Schema validation error after {}: {}", action, message)
                        }
                    }

                    let source = if action == CritiqueAction::Regenerate {
                        PayloadSource::Regenerated
                    } else {
                        PayloadSource::Fixed
                    };
                    revisions.push(PayloadRevision {
                        source,
                        pass,
                        payload: repaired.clone(),
                    });

                    record.outcome = if source == PayloadSource::Regenerated {
                        PassOutcome::Regenerated
                    } else {
                        PassOutcome::Fixed
                    };
                    record.validation = Some(validation.clone());
                    last_validation = Some(validation);
                    payload = repaired;
                }
                Err(e @ ExtractorError::RepairFailure { .. }) => {
                    if policy == CritiqueFailurePolicy::Abort {
                        return Err(e);
                    }
                    warn!("Critique pass {} repair failed, keeping current payload: {}", pass, e);
                    record.outcome = PassOutcome::RepairFailed(e.to_string());
                }
                Err(e) => return Err(e),
            }

            passes.push(record);
        }

        if !accepted {
            debug!("Critique budget exhausted without acceptance");
        }

        Ok(CritiqueOutcome {
            payload,
            accepted,
            passes,
            revisions,
            last_validation,
        })
    }

    /// Obtain a parsable verdict within `max_critique_retries` attempts
    async fn critique(
        &self,
        text: &DocumentText,
        payload: &Payload,
        cancel: &CancelToken,
    ) -> Result<CritiqueVerdict, ExtractorError> {
        let prompt = self.prompts.critique(text, payload);
        let max_attempts = self.config.max_critique_retries;

        let mut last_raw = String::new();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let raw = self.call_llm(&prompt, cancel).await?;

            let result = match parse_object(&raw) {
                Err(JsonError::NoObject) => {
                    warn!("Critique attempt {}: no JSON object, requesting reformat", attempt);
                    let repair_prompt = self.prompts.critique_repair(&raw);
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
                Ok(value) => return Ok(parse_verdict(value)),
                Err(e) => {
                    warn!("Critique attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(ExtractorError::CritiqueFailure {
            attempts: max_attempts,
            last_raw,
            last_error,
        })
    }

    /// Ask for a fixed or regenerated payload
    async fn repair(
        &self,
        text: &DocumentText,
        payload: &Payload,
        verdict: &CritiqueVerdict,
        action: CritiqueAction,
        cancel: &CancelToken,
    ) -> Result<Payload, ExtractorError> {
        let prompt = match action {
            CritiqueAction::Regenerate => {
                self.prompts.regenerate(text, verdict, self.gatekeeper.schema().text())
            }
            _ => self.prompts.fix(text, payload, verdict),
        };

        let raw = self.call_llm(&prompt, cancel).await?;

        parse_object(&raw).map_err(|e| ExtractorError::RepairFailure {
            action,
            last_raw: raw,
            reason: e.to_string(),
        })
    }
}
