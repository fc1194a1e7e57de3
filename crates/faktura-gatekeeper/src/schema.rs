//! Schema store

use crate::GatekeeperError;
use serde_json::Value;
use std::path::Path;

/// A loaded JSON Schema, kept both as parsed value and as original text
///
/// The parsed form feeds the validator; the text is pasted verbatim into
/// prompts so the model sees exactly what the author wrote. Read-only after
/// loading and cheap to share behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    text: String,
    value: Value,
}

impl SchemaDocument {
    /// Parse a schema from its serialized text
    ///
    /// # Errors
    ///
    /// - `Parse` if the text is not JSON
    /// - `InvalidSchema` if the JSON is neither an object nor a boolean
    ///
    /// # Examples
    ///
    /// ```
    /// use faktura_gatekeeper::SchemaDocument;
    ///
    /// let schema = SchemaDocument::parse(r#"{"type": "object"}"#).unwrap();
    /// assert_eq!(schema.value()["type"], "object");
    /// assert!(SchemaDocument::parse("not json").is_err());
    /// ```
    pub fn parse(text: impl Into<String>) -> Result<Self, GatekeeperError> {
        let text = text.into();
        let value: Value =
            serde_json::from_str(&text).map_err(|e| GatekeeperError::Parse(e.to_string()))?;

        if !(value.is_object() || value.is_boolean()) {
            return Err(GatekeeperError::InvalidSchema(
                "schema must be a JSON object or boolean".to_string(),
            ));
        }

        Ok(Self { text, value })
    }

    /// Load a schema from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatekeeperError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GatekeeperError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(text)
    }

    /// Build from an already parsed value
    pub fn from_value(value: Value) -> Result<Self, GatekeeperError> {
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| GatekeeperError::Parse(e.to_string()))?;
        Self::parse(text)
    }

    /// Original serialized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed schema
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Schema `title`, if any
    pub fn title(&self) -> Option<&str> {
        self.value.get("title").and_then(Value::as_str)
    }
}
