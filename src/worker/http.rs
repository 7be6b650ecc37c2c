//! HTTP client for resolver calls and tunnel downloads

use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Unexpected status: HTTP {0}")]
    Status(u16),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::RequestFailed(e.to_string())
        }
    }
}

/// Shared reqwest client with the configured timeouts and user agent
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout.as_duration())
            .timeout(config.request_timeout.as_duration())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Underlying client, for callers that speak their own protocol over it
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// The body lands in `<dest>.part` first and is renamed once complete, so
    /// a failed or cancelled transfer never leaves a truncated file under the
    /// final name. The partial file is removed in both cases.
    pub async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        debug!(url, dest = %dest.display(), "Starting download");

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = self.client.get(url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let part = part_path(dest);

        let mut file = tokio::fs::File::create(&part).await.map_err(io_error(&part))?;
        let mut written = 0u64;

        let outcome: Result<()> = async {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    chunk = response.chunk() => chunk?,
                };
                let Some(chunk) = chunk else { break };
                file.write_all(&chunk).await.map_err(io_error(&part))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io_error(&part))?;
            Ok(())
        }
        .await;

        drop(file);
        if let Err(e) = outcome {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }

        tokio::fs::rename(&part, dest).await.map_err(io_error(dest))?;
        debug!(url, size = written, "Download completed");

        Ok(written)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError + use<> {
    let path = path.to_path_buf();
    move |source| FetchError::Io { path, source }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
