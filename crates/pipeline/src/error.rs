//! Pipeline Error Types

use alerting::AlertError;
use storage::StorageError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Whether the error refers to a record that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::Alert(AlertError::NotFound(_)) | PipelineError::Storage(StorageError::NotFound)
        )
    }

    /// Whether the request conflicts with the current state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PipelineError::Alert(AlertError::AlreadyResolved(_))
                | PipelineError::Storage(StorageError::ActiveItemExists { .. })
                | PipelineError::Storage(StorageError::AlreadyStopped(_))
        )
    }
}
