//! Payload validation against a JSON Schema

use crate::{GatekeeperError, SchemaDocument, ValidationConfig};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value; `/` for the document root
    pub instance_path: String,

    /// JSON pointer to the schema keyword that failed
    pub schema_path: String,

    /// Human-readable description
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance_path, self.message)
    }
}

/// Outcome of validating one payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether the payload conforms
    pub valid: bool,

    /// First violation rendered as `<path>: <error>`; `None` when valid
    pub message: Option<String>,

    /// Retained violations, in validator order
    pub errors: Vec<SchemaViolation>,
}

impl ValidationResult {
    /// A passing result
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            errors: Vec::new(),
        }
    }

    /// A failing result built from collected violations
    pub fn from_violations(errors: Vec<SchemaViolation>) -> Self {
        if errors.is_empty() {
            return Self::ok();
        }
        Self {
            valid: false,
            message: errors.first().map(ToString::to_string),
            errors,
        }
    }
}

/// The Gatekeeper checks payloads against one compiled schema
///
/// Compilation happens once in [`Gatekeeper::new`]; validation itself never
/// fails, it only reports. The compiled validator is immutable, so a single
/// Gatekeeper can be shared across concurrent runs.
pub struct Gatekeeper {
    schema: Arc<SchemaDocument>,
    validator: jsonschema::Validator,
    config: ValidationConfig,
}

impl Gatekeeper {
    /// Compile a schema with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the configuration is invalid or the schema
    /// does not compile under the selected draft.
    pub fn new(schema: Arc<SchemaDocument>, config: ValidationConfig) -> Result<Self, GatekeeperError> {
        config.validate().map_err(GatekeeperError::InvalidSchema)?;

        let validator = match config.draft.to_jsonschema() {
            Some(draft) => jsonschema::options().with_draft(draft).build(schema.value()),
            None => jsonschema::validator_for(schema.value()),
        }
        .map_err(|e| GatekeeperError::InvalidSchema(e.to_string()))?;

        debug!(title = ?schema.title(), "Schema compiled");

        Ok(Self {
            schema,
            validator,
            config,
        })
    }

    /// Compile a schema with default configuration
    pub fn default_config(schema: Arc<SchemaDocument>) -> Result<Self, GatekeeperError> {
        Self::new(schema, ValidationConfig::default())
    }

    /// The schema this gatekeeper enforces
    pub fn schema(&self) -> &Arc<SchemaDocument> {
        &self.schema
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a payload
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use faktura_gatekeeper::{Gatekeeper, SchemaDocument};
    /// use serde_json::json;
    ///
    /// let schema = SchemaDocument::parse(r#"{"type": "object", "required": ["currency"]}"#).unwrap();
    /// let gatekeeper = Gatekeeper::default_config(Arc::new(schema)).unwrap();
    ///
    /// let result = gatekeeper.validate(&json!({"total": 10}));
    /// assert!(!result.valid);
    /// assert!(result.message.unwrap().contains("currency"));
    ///
    /// assert!(gatekeeper.validate(&json!({"currency": "EUR"})).valid);
    /// ```
    pub fn validate(&self, payload: &Value) -> ValidationResult {
        let errors: Vec<SchemaViolation> = self
            .validator
            .iter_errors(payload)
            .take(self.config.max_reported_errors)
            .map(|error| {
                let instance_path = error.instance_path.to_string();
                SchemaViolation {
                    instance_path: if instance_path.is_empty() {
                        "/".to_string()
                    } else {
                        instance_path
                    },
                    schema_path: error.schema_path.to_string(),
                    message: error.to_string(),
                }
            })
            .collect();

        ValidationResult::from_violations(errors)
    }

    /// Quick conformance check without collecting violations
    pub fn is_valid(&self, payload: &Value) -> bool {
        self.validator.is_valid(payload)
    }
}
