//! Gatekeeper configuration

use serde::{Deserialize, Serialize};

/// JSON Schema dialect used for compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDraft {
    /// Detect from the schema's `$schema` keyword
    #[default]
    Auto,
    /// Draft 4
    Draft4,
    /// Draft 6
    Draft6,
    /// Draft 7
    Draft7,
    /// Draft 2019-09
    Draft201909,
    /// Draft 2020-12
    Draft202012,
}

impl SchemaDraft {
    pub(crate) fn to_jsonschema(self) -> Option<jsonschema::Draft> {
        match self {
            SchemaDraft::Auto => None,
            SchemaDraft::Draft4 => Some(jsonschema::Draft::Draft4),
            SchemaDraft::Draft6 => Some(jsonschema::Draft::Draft6),
            SchemaDraft::Draft7 => Some(jsonschema::Draft::Draft7),
            SchemaDraft::Draft201909 => Some(jsonschema::Draft::Draft201909),
            SchemaDraft::Draft202012 => Some(jsonschema::Draft::Draft202012),
        }
    }
}

/// Configuration for schema validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Dialect override; `Auto` honours `$schema`
    pub draft: SchemaDraft,

    /// Maximum number of violations kept in a `ValidationResult`
    pub max_reported_errors: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            draft: SchemaDraft::Auto,
            max_reported_errors: 10,
        }
    }
}

impl ValidationConfig {
    /// Keep only the first violation
    pub fn first_error_only() -> Self {
        Self {
            max_reported_errors: 1,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_reported_errors == 0 {
            return Err("max_reported_errors must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.draft, SchemaDraft::Auto);
        assert_eq!(config.max_reported_errors, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_first_error_only() {
        assert_eq!(ValidationConfig::first_error_only().max_reported_errors, 1);
    }

    #[test]
    fn test_zero_errors_rejected() {
        let config = ValidationConfig {
            max_reported_errors: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_draft_deserialization() {
        let config: ValidationConfig =
            serde_json::from_str(r#"{"draft": "draft202012"}"#).unwrap();
        assert_eq!(config.draft, SchemaDraft::Draft202012);
        assert_eq!(config.max_reported_errors, 10);
        assert!(SchemaDraft::Auto.to_jsonschema().is_none());
    }
}
