//! Delivery of rendered artifacts.
//!
//! A [`Sink`] accepts one artifact at a time. Failures are returned per sink
//! and never stop delivery to the remaining ones.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::json;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::render::RenderedArtifact;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("sink responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("file write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> String;

    async fn deliver(&self, artifact: &RenderedArtifact) -> Result<(), DispatchError>;
}

#[instrument(name = "dispatch", skip_all, fields(sink = %sink.name(), format = artifact.format.as_str()))]
pub async fn dispatch(artifact: &RenderedArtifact, sink: &dyn Sink) -> Result<(), DispatchError> {
    match sink.deliver(artifact).await {
        Ok(()) => {
            info!(bytes = artifact.content.len(), "artifact delivered");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "artifact delivery failed");
            Err(e)
        }
    }
}

/// Attempts every sink in order and reports each outcome by sink name.
pub async fn dispatch_all(
    artifact: &RenderedArtifact,
    sinks: &[&dyn Sink],
) -> Vec<(String, Result<(), DispatchError>)> {
    let mut outcomes = Vec::with_capacity(sinks.len());
    for sink in sinks {
        outcomes.push((sink.name(), dispatch(artifact, *sink).await));
    }
    outcomes
}

/// Writes the artifact through a temp file in the target directory and
/// renames it into place, so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn deliver(&self, artifact: &RenderedArtifact) -> Result<(), DispatchError> {
        let path = self.path.clone();
        let content = artifact.content.clone().into_bytes();

        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &content)).await??;
        Ok(())
    }
}

/// Posts the artifact as a JSON body. Plain text is wrapped as `{"text": ...}`.
#[derive(Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
    max_attempts: u32,
    backoff: Duration,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        })
    }

    /// Retries server errors and transport failures with a linear backoff
    /// (`backoff`, `2 * backoff`, ...). Client errors are never retried.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    fn body(artifact: &RenderedArtifact) -> String {
        if artifact.format.is_json() {
            artifact.content.clone()
        } else {
            json!({ "text": artifact.content }).to_string()
        }
    }

    async fn post_once(&self, body: &str) -> Result<(), DispatchError> {
        let res = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        Err(DispatchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn retryable(err: &DispatchError) -> bool {
        match err {
            DispatchError::Status { status, .. } => *status >= 500 || *status == 429,
            // Builder errors such as a malformed URL fail the same way every time.
            DispatchError::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> String {
        "webhook".to_string()
    }

    async fn deliver(&self, artifact: &RenderedArtifact) -> Result<(), DispatchError> {
        let body = Self::body(artifact);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.post_once(&body).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts && Self::retryable(&e) => {
                    debug!(attempt, max_attempts = self.max_attempts, error = %e, "webhook post failed, retrying");
                    sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
