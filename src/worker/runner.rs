//! Job runner - drives one job from discovery through download

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::pipeline::{DownloadPipeline, PipelineError};
use crate::discovery::{self, DiscoveryController, DiscoveryError};
use crate::extractor::{ExtractError, ExtractorFactory, PageExtractor};
use crate::observability::Metrics;
use crate::registry::{TaskOutput, TaskRegistry, TaskStatus};
use crate::types::{SearchKind, SourceLocator, VideoRecord, job_folder};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid search type.")]
    InvalidSearchType(String),

    #[error("max_videos must be at least 1, got {0}")]
    InvalidMaxVideos(i64),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Could not start browser session: {0}")]
    Session(#[source] ExtractError),

    #[error("Could not open source: {0}")]
    Open(#[source] ExtractError),

    #[error("Discovery failed: {0}")]
    Discovery(#[source] DiscoveryError),

    #[error("Download failed: {0}")]
    Download(#[source] PipelineError),

    #[error("cancelled")]
    Cancelled,
}

impl From<DiscoveryError> for JobError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::Cancelled => JobError::Cancelled,
            other => JobError::Discovery(other),
        }
    }
}

impl From<PipelineError> for JobError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Cancelled => JobError::Cancelled,
            other => JobError::Download(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Everything a job needs to know, derived once at submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub kind: SearchKind,
    pub query: String,
    pub target: usize,
    pub locator: SourceLocator,
    pub max_scroll: u32,
    pub destination: PathBuf,
}

impl JobPlan {
    /// Validate a request and derive its plan
    pub fn from_request(
        search_type: &str,
        search_query: &str,
        max_videos: i64,
        videos_dir: &Path,
        default_scroll: u32,
    ) -> Result<Self> {
        let kind: SearchKind = search_type
            .parse()
            .map_err(|_| JobError::InvalidSearchType(search_type.to_string()))?;

        if max_videos < 1 {
            return Err(JobError::InvalidMaxVideos(max_videos));
        }
        let target = usize::try_from(max_videos).map_err(|_| JobError::InvalidMaxVideos(max_videos))?;

        let (locator, max_scroll) = match kind {
            SearchKind::Hashtag => (SourceLocator::hashtag(search_query), default_scroll),
            SearchKind::User => (SourceLocator::profile(search_query), default_scroll),
            SearchKind::Trending => (SourceLocator::trending(), default_scroll),
            SearchKind::Topic => {
                let topic: u32 = search_query
                    .trim()
                    .parse()
                    .map_err(|_| JobError::InvalidTopic(search_query.to_string()))?;
                let locator = match topic {
                    0 => SourceLocator::PopularVideos,
                    n => SourceLocator::HashtagListing { option_index: n - 1 },
                };
                let scroll = u32::try_from(target / 4).unwrap_or(u32::MAX).max(1);
                (locator, scroll)
            }
        };

        Ok(Self {
            kind,
            query: search_query.to_string(),
            target,
            locator,
            max_scroll,
            destination: job_folder(videos_dir, search_query, kind.as_str()),
        })
    }
}

enum Collected {
    Tags(Vec<String>),
    Videos(Vec<VideoRecord>),
}

/// Runs jobs and publishes their transitions to the registry
pub struct JobRunner {
    registry: TaskRegistry,
    factory: Arc<dyn ExtractorFactory>,
    controller: DiscoveryController,
    pipeline: DownloadPipeline,
    metrics: Arc<Metrics>,
}

impl JobRunner {
    pub fn new(
        registry: TaskRegistry,
        factory: Arc<dyn ExtractorFactory>,
        controller: DiscoveryController,
        pipeline: DownloadPipeline,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            factory,
            controller,
            pipeline,
            metrics,
        }
    }

    /// Run a job to its terminal state. Never returns an error; failures end
    /// up in the registry.
    pub async fn run(&self, task_id: &str, plan: JobPlan, cancel: CancellationToken) {
        info!(task_id, kind = %plan.kind, query = %plan.query, target = plan.target, "Job started");

        let status = match self.execute(task_id, &plan, &cancel).await {
            Ok(output) => {
                self.metrics.job_completed();
                info!(task_id, "Job completed");
                TaskStatus::Completed(output)
            }
            Err(e) => {
                self.metrics.job_failed();
                error!(task_id, error = %e, "Job failed");
                TaskStatus::failed(e.to_string())
            }
        };

        if let Err(e) = self.registry.set(task_id, status).await {
            warn!(task_id, error = %e, "Could not publish final status");
        }
    }

    async fn execute(
        &self,
        task_id: &str,
        plan: &JobPlan,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput> {
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            session = self.factory.open_session() => session.map_err(JobError::Session)?,
        };

        let collected = self.collect(session.as_mut(), plan, cancel).await;

        // Closed before anything is published or downloaded.
        if let Err(e) = session.close().await {
            warn!(task_id, error = %e, "Failed to close browser session");
        }

        match collected? {
            Collected::Tags(tags) => Ok(TaskOutput::Hashtags(tags)),
            Collected::Videos(records) => {
                if let Err(e) = self.registry.set(task_id, TaskStatus::Downloading).await {
                    warn!(task_id, error = %e, "Could not mark task downloading");
                }
                info!(task_id, count = records.len(), destination = %plan.destination.display(), "Downloading videos");
                let records = self
                    .pipeline
                    .process(records, &plan.destination, cancel)
                    .await?;
                Ok(TaskOutput::Videos(records))
            }
        }
    }

    async fn collect(
        &self,
        session: &mut dyn PageExtractor,
        plan: &JobPlan,
        cancel: &CancellationToken,
    ) -> Result<Collected> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            opened = session.open(&plan.locator) => opened.map_err(JobError::Open)?,
        }

        let references = self
            .controller
            .discover(session, plan.target, plan.max_scroll, cancel)
            .await?;
        info!(count = references.len(), target = plan.target, "Discovery finished");

        if plan.locator.yields_tags() {
            return Ok(Collected::Tags(references));
        }

        let records = discovery::enrich(session, &references, cancel).await?;
        Ok(Collected::Videos(records))
    }
}
