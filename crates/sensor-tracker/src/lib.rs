//! Sensor Availability Tracking
//!
//! Tracks which of the four device channels reported on the most recent
//! ingestion and keeps that reading for downstream consumers.

mod tracker;

pub use tracker::{SensorStatus, SensorTracker, TrackerConfig};
