use thiserror::Error;

use super::state::TaskStatus;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
}

impl RegistryError {
    pub(crate) fn transition(id: &str, from: &TaskStatus, to: &TaskStatus) -> Self {
        RegistryError::InvalidTransition {
            id: id.to_string(),
            from: from.label(),
            to: to.label(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
