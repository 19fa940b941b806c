//! Pipeline Error Types
//!
//! Errors a stage returns to the runtime that drives it. Entry-local failures
//! never surface here; they are collected in the stage's [`BatchReport`].
//!
//! [`BatchReport`]: crate::pipeline::models::BatchReport

use thiserror::Error;

use crate::errors::{RecordError, StoreError, TransportError};

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stream or store could not be reached; the whole batch is abandoned
    #[error("Collaborator '{collaborator}' unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: String,
        message: String,
    },

    /// Stage execution failed for a reason other than an unreachable collaborator
    #[error("Stage '{stage}' execution failed: {message}")]
    StageExecution { stage: String, message: String },

    /// Record codec error outside of per-entry processing
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Convenience type alias for pipeline results
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<TransportError> for PipelineError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unavailable { stream, message } => {
                PipelineError::CollaboratorUnavailable {
                    collaborator: stream,
                    message,
                }
            }
            other @ TransportError::StaleReceipt { .. } => PipelineError::StageExecution {
                stage: "transport".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable { table, message } => PipelineError::CollaboratorUnavailable {
                collaborator: table,
                message,
            },
            other @ StoreError::Rejected { .. } => PipelineError::StageExecution {
                stage: "store".to_string(),
                message: other.to_string(),
            },
        }
    }
}

// Helper methods for creating specific error types
impl PipelineError {
    /// Create a stage execution error
    pub fn stage_error(stage: &str, message: impl Into<String>) -> Self {
        PipelineError::StageExecution {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Create a collaborator unavailable error
    pub fn unavailable(collaborator: &str, message: impl Into<String>) -> Self {
        PipelineError::CollaboratorUnavailable {
            collaborator: collaborator.to_string(),
            message: message.into(),
        }
    }

    /// Whether retrying the same batch later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::CollaboratorUnavailable { .. })
    }
}
