//! Monitoring Pipeline
//!
//! Owns the per-process monitoring state (availability tracker, indicator
//! state machine) and runs each ingested reading through validation,
//! alerting and the status decision as one transaction.

mod clock;
mod context;
mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{IngestReport, MonitorContext, PipelineConfig, StatusSnapshot, StopReport};
pub use error::PipelineError;
