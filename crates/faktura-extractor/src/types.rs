//! Run report and critique types

use faktura_domain::{CritiqueAction, RunId, Severity};
use faktura_gatekeeper::ValidationResult;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt::Display;

/// A structured JSON payload (always a JSON object)
pub type Payload = Value;

fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    serializer.collect_str(value)
}

fn serialize_display_opt<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

/// Semantic audit result returned by a critique call
///
/// Consumed by the repair step and then dropped; only a
/// [`CritiquePassRecord`] survives in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueVerdict {
    /// Whether the auditor considers the payload correct
    pub valid: bool,

    /// Problems found
    pub issues: Vec<String>,

    /// Seriousness of the problems
    pub severity: Severity,

    /// Action named by the auditor; `None` if missing or unrecognized
    pub requested_action: Option<CritiqueAction>,

    /// Free-text repair guidance
    pub suggested_fix: Option<String>,

    /// The verdict object as returned, echoed into repair prompts
    pub raw: Value,
}

impl CritiqueVerdict {
    /// Action to take on this verdict
    ///
    /// Only a verdict that is both valid and explicitly accepting stops the
    /// loop. `Regenerate` is honoured as asked; everything else (an explicit
    /// fix, an accept on an invalid verdict, a missing or unknown action)
    /// becomes `Fix`.
    pub fn decision(&self) -> CritiqueAction {
        match (self.valid, self.requested_action) {
            (true, Some(CritiqueAction::Accept)) => CritiqueAction::Accept,
            (_, Some(CritiqueAction::Regenerate)) => CritiqueAction::Regenerate,
            _ => CritiqueAction::Fix,
        }
    }
}

/// Where a payload revision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// Initial JSON generation
    Generated,
    /// Patched by a fix call
    Fixed,
    /// Rebuilt by a regenerate call
    Regenerated,
}

/// One replacement of the current payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadRevision {
    /// Producer of this revision
    pub source: PayloadSource,

    /// Critique pass that produced it (0 for the initial generation)
    pub pass: u32,

    /// The payload itself
    pub payload: Payload,
}

/// How a critique pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum PassOutcome {
    /// The auditor accepted the current payload; the loop stopped
    Accepted,
    /// The payload was patched
    Fixed,
    /// The payload was rebuilt
    Regenerated,
    /// No parsable verdict; the current payload was kept
    CritiqueFailed(String),
    /// The repair call returned no usable payload; the current payload was kept
    RepairFailed(String),
}

/// Summary of one critique pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CritiquePassRecord {
    /// 1-based pass number
    pub pass: u32,

    /// Action taken (after defaulting); `None` if no verdict was obtained
    #[serde(serialize_with = "serialize_display_opt")]
    pub action: Option<CritiqueAction>,

    /// Verdict severity, if a verdict was obtained
    #[serde(serialize_with = "serialize_display_opt")]
    pub severity: Option<Severity>,

    /// Number of issues listed by the verdict
    pub issue_count: usize,

    /// How the pass ended
    pub outcome: PassOutcome,

    /// Schema validation of the repaired payload, when one was produced
    pub validation: Option<ValidationResult>,
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Run identifier
    #[serde(serialize_with = "serialize_display")]
    pub run_id: RunId,

    /// Final payload
    pub payload: Payload,

    /// True when a critique pass explicitly accepted the final payload
    pub accepted: bool,

    /// Validation right after the initial generation
    pub initial_validation: ValidationResult,

    /// Validation of the final payload
    pub final_validation: ValidationResult,

    /// Outer JSON-generation attempts used
    pub generation_attempts: u32,

    /// Critique passes, in order
    pub passes: Vec<CritiquePassRecord>,

    /// Every payload the run held, oldest first
    pub revisions: Vec<PayloadRevision>,

    /// Wall-clock duration of the run
    pub processing_time_ms: u64,

    /// Model that served the run
    pub model_name: String,
}

impl ExtractionReport {
    /// Whether the final payload conforms to the schema
    pub fn is_valid(&self) -> bool {
        self.final_validation.valid
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let critique = if self.passes.is_empty() {
            "no critique".to_string()
        } else if self.accepted {
            format!("accepted after {} critique pass(es)", self.passes.len())
        } else {
            format!("{} critique pass(es), not accepted", self.passes.len())
        };

        format!(
            "run {}: {}, {} generation attempt(s), {}, {} ms",
            self.run_id,
            if self.is_valid() { "schema-valid" } else { "schema-invalid" },
            self.generation_attempts,
            critique,
            self.processing_time_ms
        )
    }
}
