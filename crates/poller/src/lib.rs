//! Background Polling for Pull Deployments
//!
//! A slow loop fetches readings from the device and runs them through the
//! monitoring pipeline; a fast loop re-evaluates the indicator color and
//! pushes it to the device.

mod poller;

pub use poller::{PollError, Poller, PollerConfig};
