//! Text module - canonical document text

use std::fmt;

/// Whitespace-normalized document text
///
/// Produced once per run from whatever the conversion step returned and never
/// modified afterwards. Every run of whitespace (spaces, tabs, newlines, form
/// feeds, Unicode spaces) becomes a single ASCII space and both ends are
/// trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocumentText(String);

impl DocumentText {
    /// Normalize raw text into its canonical form
    ///
    /// Total over all inputs: empty or whitespace-only input yields empty text.
    ///
    /// # Examples
    ///
    /// ```
    /// use faktura_domain::DocumentText;
    ///
    /// let text = DocumentText::normalize("  Invoice\t#123\n\nTotal:   100.00 EUR \r\n");
    /// assert_eq!(text.as_str(), "Invoice #123 Total: 100.00 EUR");
    ///
    /// assert!(DocumentText::normalize(" \n\t ").is_empty());
    /// ```
    pub fn normalize(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        for word in raw.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
        Self(out)
    }

    /// Borrow the normalized text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Number of characters
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// True when nothing but whitespace was supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for DocumentText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
