//! Sequential resolve-and-fetch stage of a job

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::{FetchError, HttpClient};
use crate::observability::Metrics;
use crate::pacing::sleep_or_cancel;
use crate::resolver::{ResolveOutcome, Tunnel, TunnelResolver};
use crate::types::{LocalPath, VideoRecord};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Resolves and downloads records one at a time.
///
/// A rate-limited resolve is retried after a fixed delay for as long as it
/// takes. Any other failure marks that record [`LocalPath::Invalid`] and the
/// pipeline moves on.
#[derive(Clone)]
pub struct DownloadPipeline {
    resolver: Arc<dyn TunnelResolver>,
    http: HttpClient,
    rate_limit_delay: Duration,
    metrics: Arc<Metrics>,
}

impl DownloadPipeline {
    pub fn new(
        resolver: Arc<dyn TunnelResolver>,
        http: HttpClient,
        rate_limit_delay: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            resolver,
            http,
            rate_limit_delay,
            metrics,
        }
    }

    pub async fn process(
        &self,
        mut records: Vec<VideoRecord>,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoRecord>> {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|source| PipelineError::CreateDir {
                path: destination.to_path_buf(),
                source,
            })?;

        let total = records.len();
        let mut taken = HashSet::new();
        for (index, record) in records.iter_mut().enumerate() {
            record.local_path = self
                .download_one(&record.source_reference, destination, &mut taken, cancel)
                .await?;

            if record.local_path.is_saved() {
                self.metrics.video_downloaded();
            } else {
                self.metrics.download_failed();
            }
            info!(
                reference = %record.source_reference,
                index = index + 1,
                total,
                saved = record.local_path.is_saved(),
                "Processed video"
            );
        }

        Ok(records)
    }

    async fn download_one(
        &self,
        reference: &str,
        destination: &Path,
        taken: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<LocalPath> {
        let Some(tunnel) = self.resolve_with_backoff(reference, cancel).await? else {
            return Ok(LocalPath::Invalid);
        };

        let Some(filename) = safe_filename(&tunnel.filename) else {
            warn!(reference, filename = %tunnel.filename, "Resolver returned unusable filename");
            return Ok(LocalPath::Invalid);
        };
        let filename = unique_filename(filename, taken);
        if filename != tunnel.filename {
            debug!(reference, original = %tunnel.filename, filename = %filename, "Renamed download");
        }
        let target = destination.join(&filename);

        match self.http.fetch_to_file(&tunnel.url, &target, cancel).await {
            Ok(bytes) => {
                info!(reference, path = %target.display(), bytes, "Downloaded video");
                taken.insert(filename);
                Ok(LocalPath::Saved(target))
            }
            Err(FetchError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                warn!(reference, tunnel = %tunnel.url, error = %e, "Tunnel download failed");
                Ok(LocalPath::Invalid)
            }
        }
    }

    /// `Ok(None)` means the resolver gave a terminal answer
    async fn resolve_with_backoff(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Tunnel>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                outcome = self.resolver.resolve(reference) => outcome,
            };

            match outcome {
                Ok(ResolveOutcome::Ready(tunnel)) => return Ok(Some(tunnel)),
                Ok(ResolveOutcome::RateLimited) => {
                    self.metrics.rate_limit_wait();
                    warn!(
                        reference,
                        attempt,
                        delay_ms = self.rate_limit_delay.as_millis() as u64,
                        "Rate limit exceeded, retrying after delay"
                    );
                    if !sleep_or_cancel(self.rate_limit_delay, cancel).await {
                        return Err(PipelineError::Cancelled);
                    }
                }
                Err(e) => {
                    warn!(reference, attempt, error = %e, "Failed to resolve tunnel");
                    return Ok(None);
                }
            }
        }
    }
}

/// Final path component of a resolver-supplied name, if it is a plain file name
fn safe_filename(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        plain => Some(plain),
    }
}

/// `name`, or `stem_N.ext` with the first free `N` when a previous record of
/// the same job already saved under `name`
fn unique_filename(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (2..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
