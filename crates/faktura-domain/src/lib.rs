//! Faktura Domain Layer
//!
//! Core value objects and capability traits shared by every other crate.
//! Apart from `uuid` this crate has no external dependencies: it holds no
//! I/O and no serialization, only the concepts the pipeline is built from.
//!
//! ## Key Concepts
//!
//! - **DocumentText**: canonical, whitespace-collapsed source text
//! - **GenerationParams**: decoding parameters sent with every prompt
//! - **RunId**: identifier for one end-to-end pipeline run
//! - **CritiqueAction / Severity**: the closed vocabulary of a critique verdict
//! - **Capabilities**: `LlmProvider` and `DocumentConverter`, implemented by
//!   infrastructure crates and substituted with mocks in tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod critique;
pub mod generation;
pub mod run;
pub mod text;
pub mod traits;

// Re-exports for convenience
pub use critique::{CritiqueAction, Severity};
pub use generation::GenerationParams;
pub use run::RunId;
pub use text::DocumentText;
