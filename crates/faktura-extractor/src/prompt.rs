//! Prompt templates for extraction, critique and repair
//!
//! Every template is a pure function of its inputs. The provider is
//! stateless, so templates that follow up on an earlier answer quote it.

use crate::types::CritiqueVerdict;
use faktura_domain::DocumentText;
use serde_json::Value;

/// Maximum characters of a previous answer quoted in a follow-up prompt
pub const PREVIOUS_OUTPUT_EXCERPT_CHARS: usize = 4000;

/// Builds the prompts sent to the generation provider
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    document_kind: String,
}

impl PromptBuilder {
    /// Create a builder for a kind of document ("invoice", "receipt", ...)
    pub fn new(document_kind: impl Into<String>) -> Self {
        Self {
            document_kind: document_kind.into(),
        }
    }

    /// Kind of document named in the prompts
    pub fn document_kind(&self) -> &str {
        &self.document_kind
    }

    /// Initial extraction prompt
    pub fn extraction(&self, text: &DocumentText, schema_text: &str) -> String {
        let kind = &self.document_kind;
        format!(
            "You are an expert {kind} parser. Analyze the following {kind} text and extract key fields.\n\
             \n\
             Output requirements:\n\
             - Return ONLY a single valid JSON object (no code fences, no extra prose).\n\
             - The JSON MUST strictly validate against the following JSON Schema:\n\
             \n\
             SCHEMA:\n\
             {schema_text}\n\
             If a field is missing/uncertain in the {kind}, set it to null (while still conforming to the schema).\n\
             \n\
             {heading} text:\n\
             {text}",
            heading = capitalize(kind),
        )
    }

    /// Follow-up when a generation contained no JSON object
    pub fn repair_format(&self, schema_text: &str, previous_output: &str) -> String {
        format!(
            "Your previous output did not contain a parsable JSON object. \
             Re-output the same content as a single valid JSON object with no extra text. \
             Ensure the JSON validates against the provided schema below.\n\
             \n\
             Previous output:\n```\n{}\n```\n\
             \n\
             SCHEMA:\n```\n{}\n```",
            excerpt(previous_output),
            schema_text
        )
    }

    /// Semantic audit of a payload against the source text
    pub fn critique(&self, text: &DocumentText, payload: &Value) -> String {
        let kind = &self.document_kind;
        format!(
            "You are an exacting auditor called 'LLM critique'.\n\
             Task: strictly assess whether the JSON extraction correctly reflects the {kind} text.\n\
             Rules:\n\
             - Check for numerical mismatches (totals, VAT, currency).\n\
             - Check dates, document number, supplier identity.\n\
             - Ensure items list matches text (descriptions, quantities, unit prices, VAT rates).\n\
             - If any field is uncertain or missing in the text, JSON should set it to null.\n\
             Output a single JSON object with fields: {{\n\
             \x20 \"valid\": boolean,\n\
             \x20 \"issues\": [string],\n\
             \x20 \"severity\": \"low\"|\"medium\"|\"high\",\n\
             \x20 \"action\": \"accept\"|\"fix\"|\"regenerate\",\n\
             \x20 \"suggested_fix\": string\n\
             }}. No explanations outside JSON.\n\
             \n\
             {heading} text:\n```\n{text}\n```\n\
             \n\
             Candidate JSON:\n```\n{payload}\n```\n",
            heading = capitalize(kind),
            payload = pretty(payload),
        )
    }

    /// Follow-up when a critique contained no JSON object
    pub fn critique_repair(&self, previous_output: &str) -> String {
        format!(
            "Your previous critique did not contain a parsable JSON object. \
             Re-output the same critique as a single valid JSON object with no extra text, \
             using the fields valid, issues, severity, action and suggested_fix.\n\
             \n\
             Previous critique:\n```\n{}\n```",
            excerpt(previous_output)
        )
    }

    /// Patch the current payload using critique guidance
    pub fn fix(&self, text: &DocumentText, payload: &Value, verdict: &CritiqueVerdict) -> String {
        let kind = &self.document_kind;
        format!(
            "You previously produced a JSON extraction for the {kind} below. \
             Apply the following critique to correct mistakes and output a single valid JSON object ONLY. \
             Keep every field the critique does not mention exactly as it is.\n\
             \n\
             Critique guidance:\n{guidance}\n\
             \n\
             Original {kind} text:\n```\n{text}\n```\n\
             \n\
             Current JSON to correct:\n```\n{payload}\n```\n",
            guidance = compact(&verdict.raw),
            payload = compact(payload),
        )
    }

    /// Rebuild the payload from scratch using critique guidance
    pub fn regenerate(&self, text: &DocumentText, verdict: &CritiqueVerdict, schema_text: &str) -> String {
        let kind = &self.document_kind;
        format!(
            "Regenerate the {kind} JSON extraction from scratch, \
             ensuring it matches the {kind} text precisely. Output a single valid JSON object ONLY.\n\
             \n\
             Critique guidance:\n{guidance}\n\
             \n\
             SCHEMA:\n```\n{schema_text}\n```\n\
             \n\
             {heading} text:\n```\n{text}\n```\n",
            guidance = compact(&verdict.raw),
            heading = capitalize(kind),
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("invoice")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn excerpt(s: &str) -> &str {
    match s.char_indices().nth(PREVIOUS_OUTPUT_EXCERPT_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn compact(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use faktura_domain::{CritiqueAction, Severity};
    use serde_json::json;

    fn text() -> DocumentText {
        DocumentText::normalize("Invoice #123  Total: 100.00 EUR")
    }

    fn verdict() -> CritiqueVerdict {
        CritiqueVerdict {
            valid: false,
            issues: vec!["currency wrong".to_string()],
            severity: Severity::High,
            requested_action: Some(CritiqueAction::Fix),
            suggested_fix: Some("use EUR".to_string()),
            raw: json!({"valid": false, "issues": ["currency wrong"], "suggested_fix": "use EUR"}),
        }
    }

    #[test]
    fn test_extraction_includes_schema_and_text() {
        let builder = PromptBuilder::default();
        let prompt = builder.extraction(&text(), r#"{"type": "object"}"#);

        assert!(prompt.starts_with("You are an expert invoice parser."));
        assert!(prompt.contains("SCHEMA:\n{\"type\": \"object\"}"));
        assert!(prompt.contains("Invoice text:\nInvoice #123 Total: 100.00 EUR"));
        assert!(prompt.contains("set it to null"));
    }

    #[test]
    fn test_document_kind_threaded_through() {
        let builder = PromptBuilder::new("receipt");
        let prompt = builder.extraction(&text(), "{}");
        assert!(prompt.contains("expert receipt parser"));
        assert!(prompt.contains("Receipt text:"));
        assert!(builder.critique(&text(), &json!({})).contains("reflects the receipt text"));
    }

    #[test]
    fn test_repair_format_quotes_previous_output() {
        let prompt = PromptBuilder::default().repair_format("{\"required\": []}", "Sorry, here you go");
        assert!(prompt.starts_with("Your previous output did not contain a parsable JSON object."));
        assert!(prompt.contains("Sorry, here you go"));
        assert!(prompt.contains("{\"required\": []}"));
    }

    #[test]
    fn test_repair_excerpt_is_bounded() {
        let long = "x".repeat(PREVIOUS_OUTPUT_EXCERPT_CHARS + 500);
        let prompt = PromptBuilder::default().critique_repair(&long);
        assert!(prompt.contains(&"x".repeat(PREVIOUS_OUTPUT_EXCERPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(PREVIOUS_OUTPUT_EXCERPT_CHARS + 1)));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let s = "č".repeat(PREVIOUS_OUTPUT_EXCERPT_CHARS + 1);
        assert_eq!(excerpt(&s).chars().count(), PREVIOUS_OUTPUT_EXCERPT_CHARS);
    }

    #[test]
    fn test_critique_has_fixed_verdict_shape() {
        let prompt = PromptBuilder::default().critique(&text(), &json!({"total": 100.0}));
        assert!(prompt.starts_with("You are an exacting auditor"));
        for field in ["\"valid\"", "\"issues\"", "\"severity\"", "\"action\"", "\"suggested_fix\""] {
            assert!(prompt.contains(field), "missing {}", field);
        }
        assert!(prompt.contains("\"total\": 100.0"));
    }

    #[test]
    fn test_fix_carries_guidance_and_payload() {
        let prompt = PromptBuilder::default().fix(&text(), &json!({"currency": "USD"}), &verdict());
        assert!(prompt.contains("Apply the following critique"));
        assert!(prompt.contains("use EUR"));
        assert!(prompt.contains("{\"currency\":\"USD\"}"));
        assert!(prompt.contains("Invoice #123 Total: 100.00 EUR"));
    }

    #[test]
    fn test_regenerate_omits_previous_payload() {
        let prompt = PromptBuilder::default().regenerate(&text(), &verdict(), "{\"type\":\"object\"}");
        assert!(prompt.starts_with("Regenerate the invoice JSON extraction"));
        assert!(prompt.contains("use EUR"));
        assert!(prompt.contains("{\"type\":\"object\"}"));
        assert!(!prompt.contains("Current JSON"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("invoice"), "Invoice");
        assert_eq!(capitalize(""), "");
    }
}
