//! Job submission and lifecycle
//!
//! Submission validates the request, registers a task and spawns the job in
//! the background. Each running job holds a child of the orchestrator's root
//! [`CancellationToken`], so a single job or all of them can be stopped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::discovery::{DiscoveryController, DiscoveryPolicy};
use crate::extractor::ExtractorFactory;
use crate::observability::Metrics;
use crate::registry::{TaskRegistry, TaskStatus};
use crate::resolver::TunnelResolver;
use crate::worker::{DownloadPipeline, HttpClient, JobPlan, JobRunner};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CancelError {
    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Task {0} already finished")]
    AlreadyFinished(String),
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: TaskRegistry,
    runner: Arc<JobRunner>,
    metrics: Arc<Metrics>,
    videos_dir: PathBuf,
    max_scroll: u32,
    root: CancellationToken,
    jobs: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        registry: TaskRegistry,
        metrics: Arc<Metrics>,
        factory: Arc<dyn ExtractorFactory>,
        resolver: Arc<dyn TunnelResolver>,
        http: HttpClient,
    ) -> Self {
        let pipeline = DownloadPipeline::new(
            resolver,
            http,
            config.resolver.rate_limit_delay.as_duration(),
            metrics.clone(),
        );
        let controller = DiscoveryController::new(DiscoveryPolicy::from(&config.discovery));
        let runner = JobRunner::new(
            registry.clone(),
            factory,
            controller,
            pipeline,
            metrics.clone(),
        );

        Self {
            registry,
            runner: Arc::new(runner),
            metrics,
            videos_dir: config.server.videos_dir.clone(),
            max_scroll: config.discovery.max_scroll_per_pass,
            root: CancellationToken::new(),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a job and start it in the background.
    ///
    /// Always returns a task id. An invalid request is recorded as `Failed`
    /// right away and no job is started.
    pub async fn submit(&self, search_type: &str, search_query: &str, max_videos: i64) -> String {
        let id = self.registry.create().await;
        self.metrics.job_submitted();

        let plan = match JobPlan::from_request(
            search_type,
            search_query,
            max_videos,
            &self.videos_dir,
            self.max_scroll,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(task_id = %id, search_type, error = %e, "Rejected job");
                self.metrics.job_failed();
                if let Err(e) = self.registry.set(&id, TaskStatus::failed(e.to_string())).await {
                    warn!(task_id = %id, error = %e, "Could not record rejection");
                }
                return id;
            }
        };

        let cancel = self.root.child_token();
        self.jobs.lock().await.insert(id.clone(), cancel.clone());

        let runner = self.runner.clone();
        let jobs = self.jobs.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            runner.run(&task_id, plan, cancel).await;
            jobs.lock().await.remove(&task_id);
        });

        info!(task_id = %id, search_type, search_query, max_videos, "Job submitted");
        id
    }

    /// Request cancellation of one running job
    pub async fn cancel(&self, id: &str) -> Result<(), CancelError> {
        let Some(task) = self.registry.get(id).await else {
            return Err(CancelError::UnknownTask(id.to_string()));
        };
        if task.status.is_terminal() {
            return Err(CancelError::AlreadyFinished(id.to_string()));
        }

        match self.jobs.lock().await.get(id) {
            Some(token) => {
                info!(task_id = %id, "Cancelling job");
                token.cancel();
                Ok(())
            }
            None => Err(CancelError::AlreadyFinished(id.to_string())),
        }
    }

    /// Cancel every running job
    pub fn shutdown(&self) {
        info!("Cancelling all running jobs");
        self.root.cancel();
    }

    pub async fn running(&self) -> usize {
        self.jobs.lock().await.len()
    }
}
