//! HTTP client for an LLMWhisperer v2 style conversion service

use crate::config::WhispererConfig;
use crate::error::ConvertError;
use faktura_domain::traits::{ConversionStatus, DocumentConverter, JobHandle};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Header carrying the API key
const API_KEY_HEADER: &str = "unstract-key";

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    whisper_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    result_text: String,
}

/// Client for submitting documents and fetching their text
///
/// Implements [`DocumentConverter`] with blocking calls, so it is meant to be
/// driven from a blocking thread (see [`crate::ConversionPoller`]). The async
/// methods can be used directly from async code.
#[derive(Debug, Clone)]
pub struct WhispererClient {
    config: WhispererConfig,
    client: reqwest::Client,
}

impl WhispererClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid configuration, `Transport` if the HTTP
    /// client cannot be built.
    pub fn new(config: WhispererConfig) -> Result<Self, ConvertError> {
        config.validate().map_err(ConvertError::Config)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConvertError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Connection settings in use
    pub fn config(&self) -> &WhispererConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ConvertError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ConvertError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConvertError::Transport(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ConvertError::InvalidResponse(e.to_string()))
    }

    /// Upload a document and return the job handle
    pub async fn submit_async(&self, bytes: &[u8], filename: &str) -> Result<JobHandle, ConvertError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ConvertError::InvalidResponse(e.to_string()))?;
        let form = Form::new().part("document", part);

        debug!("Submitting {} ({} bytes) for conversion", filename, bytes.len());

        let request = self
            .client
            .post(self.url("whisper"))
            .query(&[
                ("mode", self.config.mode.as_str()),
                ("output_mode", self.config.output_mode.as_str()),
            ])
            .multipart(form);

        let response: SubmitResponse = self.send(request).await?;
        response
            .whisper_hash
            .filter(|hash| !hash.is_empty())
            .map(JobHandle::new)
            .ok_or_else(|| ConvertError::InvalidResponse("missing whisper_hash".to_string()))
    }

    /// Check the status of a job
    pub async fn status_async(&self, job: &JobHandle) -> Result<ConversionStatus, ConvertError> {
        let request = self
            .client
            .get(self.url("whisper-status"))
            .query(&[("whisper_hash", job.as_str())]);

        let response: StatusResponse = self.send(request).await?;
        Ok(interpret_status(&response.status, response.message))
    }

    /// Fetch the extracted text of a finished job
    pub async fn retrieve_async(&self, job: &JobHandle) -> Result<String, ConvertError> {
        let request = self
            .client
            .get(self.url("whisper-retrieve"))
            .query(&[("whisper_hash", job.as_str())]);

        let response: RetrieveResponse = self.send(request).await?;
        Ok(response.result_text)
    }
}

/// Map a service status string onto a [`ConversionStatus`]
fn interpret_status(status: &str, message: Option<String>) -> ConversionStatus {
    match status.to_ascii_lowercase().as_str() {
        "processed" => ConversionStatus::Processed,
        "failed" | "error" => {
            ConversionStatus::Failed(message.unwrap_or_else(|| status.to_string()))
        }
        _ => ConversionStatus::Pending(status.to_string()),
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, ConvertError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| ConvertError::Transport(format!("Failed to start runtime: {}", e)))?;
            Ok(runtime.block_on(future))
        }
    }
}

impl DocumentConverter for WhispererClient {
    type Error = ConvertError;

    fn submit(&self, bytes: &[u8], filename: &str) -> Result<JobHandle, Self::Error> {
        block_on(self.submit_async(bytes, filename))?
    }

    fn poll_status(&self, job: &JobHandle) -> Result<ConversionStatus, Self::Error> {
        block_on(self.status_async(job))?
    }

    fn retrieve(&self, job: &JobHandle) -> Result<String, Self::Error> {
        block_on(self.retrieve_async(job))?
    }
}
