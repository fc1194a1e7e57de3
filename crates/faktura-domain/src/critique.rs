//! Critique vocabulary - severity and recommended action
//!
//! A critique verdict comes back from a text generator, so every field is
//! untrusted input. Both enums parse leniently; the fallback rules live here
//! so every consumer applies the same ones.

use std::fmt;

/// How serious the issues found by a critique are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Cosmetic or uncertain issues
    Low,

    /// Wrong values that do not change totals or identity
    Medium,

    /// Wrong totals, identities, or missing line items
    High,
}

impl Severity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Parse a severity from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }

    /// Parse with fallback: missing or unknown severity counts as medium
    pub fn parse_or_default(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or_default()
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a critique recommends doing with the current payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CritiqueAction {
    /// Keep the payload as final
    Accept,

    /// Patch the payload, preserving fields the critique did not call out
    Fix,

    /// Discard the payload and rebuild it from the source text
    Regenerate,
}

impl CritiqueAction {
    /// Get the action name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CritiqueAction::Accept => "accept",
            CritiqueAction::Fix => "fix",
            CritiqueAction::Regenerate => "regenerate",
        }
    }

    /// Parse an action from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Some(CritiqueAction::Accept),
            "fix" => Some(CritiqueAction::Fix),
            "regenerate" => Some(CritiqueAction::Regenerate),
            _ => None,
        }
    }

    /// Parse with fallback: missing or unrecognized actions become `Fix`
    ///
    /// # Examples
    ///
    /// ```
    /// use faktura_domain::CritiqueAction;
    ///
    /// assert_eq!(CritiqueAction::parse_or_fix(Some("Regenerate")), CritiqueAction::Regenerate);
    /// assert_eq!(CritiqueAction::parse_or_fix(Some("rewrite")), CritiqueAction::Fix);
    /// assert_eq!(CritiqueAction::parse_or_fix(None), CritiqueAction::Fix);
    /// ```
    pub fn parse_or_fix(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or(CritiqueAction::Fix)
    }
}

impl fmt::Display for CritiqueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
