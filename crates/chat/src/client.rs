//! Client side of the conversion API.

use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    futures::StreamExt,
    mediaferry_media::JobSpecification,
    serde::{Deserialize, Serialize},
    tokio::io::AsyncWriteExt,
    tracing::debug,
};

use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    url: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

/// Successful submission: where to fetch the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Converted {
    pub message: String,
    /// Server-relative retrieval path, e.g. `/downloads/audio_x.mp3`.
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    file_path: String,
    error: Option<String>,
}

/// Submission and retrieval, as the conversation layer needs them.
#[async_trait]
pub trait ConversionClient: Send + Sync {
    async fn convert(&self, spec: &JobSpecification) -> Result<Converted>;

    /// Stream the artifact at `file_path` into `dest`; returns bytes written.
    async fn download(&self, file_path: &str, dest: &Path) -> Result<u64>;
}

/// [`ConversionClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpConversionClient {
    /// `timeout` bounds each request, including the whole conversion.
    /// `None` waits as long as the server takes.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ConversionClient for HttpConversionClient {
    async fn convert(&self, spec: &JobSpecification) -> Result<Converted> {
        let body = ConvertRequest {
            url: spec.source_locator(),
            format: spec.target_format().wire_name(),
            quality: spec.quality_hint(),
        };
        let resp = self
            .http
            .post(format!("{}/api/convert", self.base_url))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        let parsed: Option<ConvertResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(ConvertResponse {
                error: Some(error), ..
            }) => Err(Error::conversion(error)),
            Some(ConvertResponse {
                message, file_path, ..
            }) if status.is_success() && !file_path.is_empty() => {
                debug!(%file_path, "conversion accepted");
                Ok(Converted { message, file_path })
            },
            _ => Err(Error::conversion(format!(
                "conversion service returned {status}"
            ))),
        }
    }

    async fn download(&self, file_path: &str, dest: &Path) -> Result<u64> {
        let resp = self
            .http
            .get(format!("{}{file_path}", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(%file_path, written, "artifact downloaded");
        Ok(written)
    }
}
