//! Faktura Convert
//!
//! Turns binary documents (PDFs, scans) into plain text by way of an
//! external conversion service, ready for the extraction pipeline.
//!
//! # Overview
//!
//! Conversion is asynchronous on the service side:
//! 1. **Submit**: upload the document and receive a job handle
//! 2. **Poll**: check the job status until it is processed or failed
//! 3. **Retrieve**: download the extracted text
//!
//! [`WhispererClient`] speaks an LLMWhisperer v2 style HTTP API and
//! implements [`DocumentConverter`]. [`ConversionPoller`] drives any
//! converter through the three steps with a bounded wait and returns
//! normalized [`DocumentText`](faktura_domain::DocumentText).
//!
//! # Usage
//!
//! ```no_run
//! use faktura_convert::{ConversionPoller, PollConfig, WhispererClient, WhispererConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WhispererConfig::default()
//!         .with_api_key(std::env::var("LLMWHISPERER_API_KEY")?)
//!         .with_mode("form");
//!     let poller = ConversionPoller::new(WhispererClient::new(config)?, PollConfig::with_backoff())?;
//!
//!     let conversion = poller.convert(std::fs::read("invoice.pdf")?, "invoice.pdf").await?;
//!     println!("{}", conversion.summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [converter]
//! base_url = "https://llmwhisperer-api.us-central.unstract.com/api/v2"
//! mode = "high_quality"
//! output_mode = "text"
//!
//! [converter.poll]
//! poll_interval_secs = 5
//! max_polls = 60
//! backoff = false
//! max_interval_secs = 30
//! ```
//!
//! [`DocumentConverter`]: faktura_domain::traits::DocumentConverter

#![warn(missing_docs)]

mod config;
mod error;
mod poller;
mod whisperer;

pub use config::{PollConfig, WhispererConfig, DEFAULT_WHISPERER_URL};
pub use error::ConvertError;
pub use poller::{Conversion, ConversionPoller};
pub use whisperer::WhispererClient;
