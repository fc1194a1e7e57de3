//! Bounded wait for conversion jobs

use crate::{ConvertError, PollConfig};
use faktura_domain::traits::{ConversionStatus, DocumentConverter, JobHandle};
use faktura_domain::DocumentText;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Text of a converted document, plus how long it took to get it
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Job the text came from
    pub job: JobHandle,

    /// Normalized document text
    pub text: DocumentText,

    /// Status checks performed before the job finished
    pub polls: u32,

    /// Wall-clock time from submission to retrieval (in milliseconds)
    pub elapsed_ms: u64,
}

impl Conversion {
    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "job {}: {} chars after {} status check(s), {} ms",
            self.job,
            self.text.char_count(),
            self.polls,
            self.elapsed_ms
        )
    }
}

/// Drives a [`DocumentConverter`] from submission to retrieved text
///
/// Converter calls are blocking, so each one runs on tokio's blocking pool.
/// Waiting is bounded by [`PollConfig::max_polls`]; dropping the future
/// stops polling.
///
/// # Examples
///
/// ```no_run
/// use faktura_convert::{ConversionPoller, PollConfig, WhispererClient, WhispererConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = WhispererClient::new(WhispererConfig::default().with_api_key("key"))?;
///     let poller = ConversionPoller::new(client, PollConfig::default())?;
///
///     let bytes = std::fs::read("invoice.pdf")?;
///     let conversion = poller.convert(bytes, "invoice.pdf").await?;
///     println!("{}", conversion.text);
///     Ok(())
/// }
/// ```
pub struct ConversionPoller<C> {
    converter: Arc<C>,
    config: PollConfig,
}

impl<C> ConversionPoller<C>
where
    C: DocumentConverter + Send + Sync + 'static,
    C::Error: Into<ConvertError>,
{
    /// Create a poller
    ///
    /// # Errors
    ///
    /// Returns `Config` if the poll configuration does not validate.
    pub fn new(converter: C, config: PollConfig) -> Result<Self, ConvertError> {
        config.validate().map_err(ConvertError::Config)?;
        Ok(Self {
            converter: Arc::new(converter),
            config,
        })
    }

    /// Active poll configuration
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Submit a document, wait for it, and return its normalized text
    pub async fn convert(&self, bytes: Vec<u8>, filename: &str) -> Result<Conversion, ConvertError> {
        let start_time = Instant::now();

        let converter = Arc::clone(&self.converter);
        let name = filename.to_string();
        let job = self
            .blocking(move || converter.submit(&bytes, &name))
            .await?;

        tracing::info!("Submitted {} for conversion as job {}", filename, job);

        let polls = self.wait(&job).await?;

        let converter = Arc::clone(&self.converter);
        let handle = job.clone();
        let raw = self.blocking(move || converter.retrieve(&handle)).await?;
        let text = DocumentText::normalize(&raw);

        let conversion = Conversion {
            job,
            text,
            polls,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        tracing::info!("Conversion complete: {}", conversion.summary());

        Ok(conversion)
    }

    /// Poll until the job is processed; returns the number of checks made
    ///
    /// # Errors
    ///
    /// - `JobFailed` if the service reports failure
    /// - `Timeout` once `max_polls` checks found the job still pending
    pub async fn wait(&self, job: &JobHandle) -> Result<u32, ConvertError> {
        let max_polls = self.config.max_polls;

        for poll in 1..=max_polls {
            sleep(self.config.interval_for(poll)).await;

            let converter = Arc::clone(&self.converter);
            let handle = job.clone();
            let status = self
                .blocking(move || converter.poll_status(&handle))
                .await?;

            match status {
                ConversionStatus::Processed => {
                    tracing::debug!("Job {} processed after {} check(s)", job, poll);
                    return Ok(poll);
                }
                ConversionStatus::Failed(reason) => {
                    tracing::warn!("Job {} failed: {}", job, reason);
                    return Err(ConvertError::JobFailed(reason));
                }
                ConversionStatus::Pending(state) => {
                    tracing::debug!("Job {} check {}/{}: {}", job, poll, max_polls, state);
                }
            }
        }

        tracing::warn!("Job {} still pending after {} checks", job, max_polls);
        Err(ConvertError::Timeout { polls: max_polls })
    }

    async fn blocking<T, F>(&self, call: F) -> Result<T, ConvertError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, C::Error> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || call().map_err(Into::<ConvertError>::into))
            .await
            .map_err(|e| ConvertError::Transport(format!("Task join error: {}", e)))?
    }
}
