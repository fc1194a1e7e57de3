//! Faktura Gatekeeper
//!
//! Schema store and schema validator.
//!
//! The Gatekeeper provides:
//! - Loading a JSON Schema once, keeping its original text for prompting
//! - Compiling it for any supported draft
//! - Validating payloads into a structured, never-fatal `ValidationResult`
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use faktura_gatekeeper::{Gatekeeper, SchemaDocument, ValidationConfig};
//!
//! let schema = Arc::new(SchemaDocument::from_file("schemas/invoice.schema.json").unwrap());
//! let gatekeeper = Gatekeeper::new(schema, ValidationConfig::default()).unwrap();
//!
//! // let result = gatekeeper.validate(&payload);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod schema;
mod validator;

pub use config::{SchemaDraft, ValidationConfig};
pub use error::GatekeeperError;
pub use schema::SchemaDocument;
pub use validator::{Gatekeeper, SchemaViolation, ValidationResult};
