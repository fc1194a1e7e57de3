//! Output formatting for the CLI.

use crate::error::Result;
use colored::*;
use faktura_extractor::{CritiquePassRecord, ExtractionReport, PassOutcome};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// What an extraction run writes to its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The payload as pretty JSON
    #[default]
    Json,
    /// The whole report as pretty JSON
    Report,
    /// The payload, then a table of critique passes
    Table,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of a run.
    pub fn format_report(&self, report: &ExtractionReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report.payload)?),
            OutputFormat::Report => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => {
                let payload = serde_json::to_string_pretty(&report.payload)?;
                Ok(format!("{}\n\n{}", payload, self.format_passes(&report.passes)))
            }
        }
    }

    /// Format critique passes as a table.
    pub fn format_passes(&self, passes: &[CritiquePassRecord]) -> String {
        if passes.is_empty() {
            return self.colorize("No critique passes.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Pass", "Action", "Severity", "Issues", "Outcome", "Schema"]);

        for pass in passes {
            let action = pass.action.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
            let severity = pass.severity.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
            let schema = match &pass.validation {
                Some(v) if v.valid => "valid".to_string(),
                Some(_) => "invalid".to_string(),
                None => "-".to_string(),
            };
            builder.push_record([
                pass.pass.to_string(),
                action,
                severity,
                pass.issue_count.to_string(),
                outcome_label(&pass.outcome).to_string(),
                schema,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// One-line run summary, green when the payload is schema-valid.
    pub fn summary(&self, report: &ExtractionReport) -> String {
        if report.is_valid() {
            self.success(&report.summary())
        } else {
            let mut line = self.warning(&report.summary());
            if let Some(message) = &report.final_validation.message {
                line.push('\n');
                line.push_str(&self.colorize(&format!("  first violation: {}", message), "yellow"));
            }
            line
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn outcome_label(outcome: &PassOutcome) -> &'static str {
    match outcome {
        PassOutcome::Accepted => "accepted",
        PassOutcome::Fixed => "fixed",
        PassOutcome::Regenerated => "regenerated",
        PassOutcome::CritiqueFailed(_) => "critique failed",
        PassOutcome::RepairFailed(_) => "repair failed",
    }
}
