//! Alerting System
//!
//! Opens, refreshes and resolves excursion alerts for the monitored item and
//! defines the persistence boundary the alerts are written through.

mod error;
mod manager;
mod store;
mod types;

pub use error::AlertError;
pub use manager::{AlertManager, CycleOutcome};
pub use store::AlertStore;
pub use types::{
    minutes_between, Alert, AlertChanges, AlertId, AlertKind, AlertState, NewAlert, Refresh,
    ResolutionCause, Resolve,
};
