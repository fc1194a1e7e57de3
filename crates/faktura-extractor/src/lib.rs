//! Faktura Extractor
//!
//! Turns document text into a JSON object that conforms to a caller-supplied
//! JSON Schema, using a text generation model as the extraction engine.
//!
//! # Overview
//!
//! The model is treated as an unreliable component. The value of this crate
//! lies in the control logic around it: schema-anchored prompts, bounded
//! retries to recover parsable JSON, independent schema validation, and an
//! optional critique loop that audits the payload against the source text
//! and decides whether to accept, patch, or regenerate it.
//!
//! # Architecture
//!
//! ```text
//! Text → normalize → generate (retries) → Gatekeeper → critique ⇄ fix/regenerate → Report
//! ```
//!
//! # Key Features
//!
//! - **Depth-aware JSON recovery**: finds the first balanced object in chatty output
//! - **Bounded retries**: per-attempt format repair, then a terminal `ExtractionFailure`
//! - **Critique loop**: closed `accept | fix | regenerate` decision with a default to fix
//! - **Audit trail**: every payload revision and pass outcome is kept in the report
//! - **Cooperative cancellation** between stages via `CancelToken`
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use faktura_extractor::{ExtractorConfig, Pipeline};
//! use faktura_gatekeeper::{Gatekeeper, SchemaDocument};
//! use faktura_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(SchemaDocument::from_file("schemas/invoice.schema.json")?);
//! let gatekeeper = Arc::new(Gatekeeper::default_config(schema)?);
//! let llm = MockProvider::new(r#"{"invoice_number": "123"}"#);
//!
//! let pipeline = Pipeline::new(llm, gatekeeper, ExtractorConfig::default())?;
//! let report = pipeline.run("Invoice #123 Total: 100.00 EUR").await?;
//!
//! println!("{}", report.summary());
//! println!("{}", serde_json::to_string_pretty(&report.payload)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cancel;
mod config;
mod critique;
mod error;
mod parser;
mod pipeline;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use config::{CritiqueFailurePolicy, ExtractorConfig};
pub use error::ExtractorError;
pub use parser::{extract_first_object, parse_object, parse_verdict, JsonError};
pub use pipeline::Pipeline;
pub use prompt::PromptBuilder;
pub use types::{
    CritiquePassRecord, CritiqueVerdict, ExtractionReport, PassOutcome, Payload,
    PayloadRevision, PayloadSource,
};
