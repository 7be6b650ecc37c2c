use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::VideoRecord;

/// What a completed job produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Videos(Vec<VideoRecord>),
    Hashtags(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Processing,
    Downloading,
    Completed(TaskOutput),
    Failed { error: String },
}

impl TaskStatus {
    pub fn failed(error: impl Into<String>) -> Self {
        TaskStatus::Failed {
            error: error.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed(_) => "completed",
            TaskStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed(_) | TaskStatus::Failed { .. })
    }

    /// Video jobs complete from `Downloading`, tag jobs straight from `Processing`.
    pub fn can_transition_to(&self, next: &TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Processing, TaskStatus::Downloading) => true,
            (TaskStatus::Processing, TaskStatus::Completed(TaskOutput::Hashtags(_))) => true,
            (TaskStatus::Downloading, TaskStatus::Completed(TaskOutput::Videos(_))) => true,
            (TaskStatus::Processing | TaskStatus::Downloading, TaskStatus::Failed { .. }) => true,
            _ => false,
        }
    }
}

/// Status record of one submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: TaskStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }
}

// Flat layout: {"status": "completed", "videos": [...]} / {"status": "failed", "error": "..."}
impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("status", self.status.label())?;
        match &self.status {
            TaskStatus::Completed(TaskOutput::Videos(videos)) => {
                map.serialize_entry("videos", videos)?
            }
            TaskStatus::Completed(TaskOutput::Hashtags(tags)) => {
                map.serialize_entry("hashtags", tags)?
            }
            TaskStatus::Failed { error } => map.serialize_entry("error", error)?,
            TaskStatus::Processing | TaskStatus::Downloading => {}
        }
        map.serialize_entry("created_at", &self.created_at)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        map.end()
    }
}
