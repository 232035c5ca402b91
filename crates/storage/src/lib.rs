//! Storage Layer
//!
//! Provides in-memory persistence for readings, alerts and monitoring
//! sessions with repository pattern.

mod repository;

pub use repository::{
    AlertFilter, ItemCatalog, MonitoredItem, NewMonitoredItem, ReadingRecord, ReadingStore,
    Repository,
};

use sensor_protocol::ItemId;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Item {id} ('{name}') is already being monitored; stop it before starting another")]
    ActiveItemExists { id: ItemId, name: String },
    #[error("Monitoring of item {0} has already been stopped")]
    AlreadyStopped(ItemId),
}

impl From<StorageError> for alerting::AlertError {
    fn from(err: StorageError) -> Self {
        alerting::AlertError::Persistence(err.to_string())
    }
}
