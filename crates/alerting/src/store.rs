//! Alert Persistence Boundary

use crate::error::AlertError;
use crate::types::{Alert, AlertChanges, AlertId};
use sensor_protocol::ItemId;

/// Persistence collaborator for alerts
///
/// The alert manager is the only caller that writes through this trait.
pub trait AlertStore: Send + Sync {
    /// Pending alerts of one monitored item, oldest first
    fn pending_for_item(&self, item_id: ItemId) -> Result<Vec<Alert>, AlertError>;

    /// Number of pending alerts across all items
    fn pending_count(&self) -> Result<usize, AlertError>;

    /// Look up an alert by id
    fn alert(&self, id: AlertId) -> Result<Option<Alert>, AlertError>;

    /// Apply a batch atomically and return the alerts it created
    ///
    /// Either every change in the batch is persisted or none is.
    fn apply(&self, changes: &AlertChanges) -> Result<Vec<Alert>, AlertError>;
}
