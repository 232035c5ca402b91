//! Status Decision Engine
//!
//! Decides the single indicator color from open alerts, sensor availability
//! and proximity of the latest values to the edges of the storage range.

mod engine;

pub use engine::{Decision, DecisionInput, DecisionReason, StatusConfig, StatusEngine};
