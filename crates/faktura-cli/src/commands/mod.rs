//! Command implementations.

pub mod config;
pub mod convert;
pub mod extract;
pub mod process;

pub use self::config::execute_config;
pub use self::convert::execute_convert;
pub use self::extract::execute_extract;
pub use self::process::execute_process;

use crate::config::Config;
use crate::error::{CliError, Result};
use faktura_convert::{Conversion, ConversionPoller, WhispererClient};
use faktura_domain::traits::LlmProvider;
use faktura_extractor::{CancelToken, ExtractionReport, Pipeline};
use faktura_gatekeeper::{Gatekeeper, SchemaDocument};
use faktura_llm::OpenAiProvider;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Build the pipeline described by `config`.
pub(crate) fn build_pipeline(config: &Config) -> Result<Pipeline<OpenAiProvider>> {
    config.validate()?;

    let schema = SchemaDocument::from_file(&config.paths.schema)?;
    tracing::debug!(
        "Loaded schema {} ({})",
        config.paths.schema.display(),
        schema.title().unwrap_or("untitled")
    );
    let gatekeeper = Gatekeeper::new(Arc::new(schema), config.validation.clone())?;

    if config.provider.api_key.is_none() {
        tracing::warn!(
            "{} is not set; requests will be sent without a bearer token",
            config.provider.api_key_env
        );
    }
    let provider = OpenAiProvider::new(config.openai_config())?;

    Ok(Pipeline::new(provider, Arc::new(gatekeeper), config.pipeline.clone())?)
}

/// Run the pipeline; Ctrl-C cancels at the next stage boundary.
pub(crate) async fn run_pipeline<L>(pipeline: &Pipeline<L>, raw: &[u8]) -> Result<ExtractionReport>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let text = std::str::from_utf8(raw)
        .map_err(|e| CliError::InvalidInput(format!("Input is not valid UTF-8: {}", e)))?;

    let cancel = CancelToken::new();
    let run = pipeline.run_with_cancel(text, &cancel);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupt received, stopping after the current call");
            cancel.cancel();
            Ok(run.await?)
        }
    }
}

/// Convert a document with the configured service; Ctrl-C abandons the wait.
pub(crate) async fn convert_document(config: &Config, file: &Path) -> Result<Conversion> {
    config
        .converter
        .poll
        .validate()
        .map_err(|e| CliError::Config(format!("converter.poll: {}", e)))?;

    if config.converter.api_key.is_none() {
        tracing::warn!("{} is not set", config.converter.api_key_env);
    }

    let bytes = fs::read(file)?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    let client = WhispererClient::new(config.whisperer_config())?;
    let poller = ConversionPoller::new(client, config.converter.poll.clone())?;

    tokio::select! {
        result = poller.convert(bytes, &filename) => Ok(result?),
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    }
}

/// Write to `path`, or to stdout when there is none.
pub(crate) fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, format!("{}\n", contents))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}
