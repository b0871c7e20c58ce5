//! Error type shared by the backend, the diff engine and the reactive layer
use crate::types::{NodeHandle, TaskId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Unknown node kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Stale node handle {handle}")]
    StaleNode { handle: NodeHandle },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeHandle, child: NodeHandle },

    #[error("Descriptor '{kind}' has no bound node")]
    Unbound { kind: String },

    #[error("Invalid descriptor: {details}")]
    InvalidDescriptor { details: String },

    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversionError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Task {task} failed: {details}")]
    TaskFailed { task: TaskId, details: String },
}

impl ReconcilerError {
    /// Shorthand used by task bodies that fail for domain reasons.
    pub fn task_failed(task: TaskId, details: impl Into<String>) -> Self {
        ReconcilerError::TaskFailed {
            task,
            details: details.into(),
        }
    }
}
