//! Alerting Error Types

use crate::types::AlertId;
use thiserror::Error;

/// Errors raised by the alert manager and its store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    /// The persistence collaborator failed; nothing from the batch was applied
    #[error("Alert persistence failed: {0}")]
    Persistence(String),

    /// No alert with this id
    #[error("Alert {0} not found")]
    NotFound(AlertId),

    /// Alert is already resolved
    #[error("Alert {0} is already resolved")]
    AlreadyResolved(AlertId),
}
