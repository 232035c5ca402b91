//! Alert Data Model

use chrono::{DateTime, Utc};
use sensor_protocol::{Bounds, ItemId, Parameter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to an alert by the store
pub type AlertId = i64;

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameter", rename_all = "snake_case")]
pub enum AlertKind {
    /// A parameter left its storage range
    OutOfRange(Parameter),
    /// A single sensor channel stopped reporting
    ChannelUnreachable(Parameter),
    /// Both critical channels stopped reporting
    DeviceUnreachable,
}

impl AlertKind {
    /// Parameter the alert refers to, if any
    pub fn parameter(&self) -> Option<Parameter> {
        match self {
            AlertKind::OutOfRange(p) | AlertKind::ChannelUnreachable(p) => Some(*p),
            AlertKind::DeviceUnreachable => None,
        }
    }

    /// Whether this is a sensor availability alert rather than a range alert
    pub fn is_availability(&self) -> bool {
        !matches!(self, AlertKind::OutOfRange(_))
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::OutOfRange(p) => write!(f, "{} out of range", p),
            AlertKind::ChannelUnreachable(p) => write!(f, "{} sensor unreachable", p),
            AlertKind::DeviceUnreachable => f.write_str("device unreachable"),
        }
    }
}

/// Lifecycle state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Pending,
    Resolved,
}

/// Why an alert was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionCause {
    /// The parameter returned to range or the channel recovered
    Automatic,
    /// An operator closed the alert
    Manual,
    /// The monitoring session of the item was stopped
    SessionEnded,
    /// A device unreachable alert took over this channel alert
    Superseded,
}

/// One continuous excursion episode for one (item, kind) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub item_id: ItemId,
    pub kind: AlertKind,
    /// Stored reading that opened the alert
    pub reading_id: Option<i64>,
    /// Value that opened the alert (range alerts only)
    pub measured_value: Option<f64>,
    /// Bounds in force when the alert opened (range alerts only)
    pub bounds: Option<Bounds>,
    pub message: String,
    pub generated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Minutes between generation and the last confirmation or resolution
    pub duration_minutes: f64,
    pub state: AlertState,
    pub resolution: Option<ResolutionCause>,
    pub resolution_message: Option<String>,
}

impl Alert {
    /// Materialize a new pending alert with the store-assigned id
    pub fn from_new(id: AlertId, new: &NewAlert) -> Self {
        Self {
            id,
            item_id: new.item_id,
            kind: new.kind,
            reading_id: new.reading_id,
            measured_value: new.measured_value,
            bounds: new.bounds,
            message: new.message.clone(),
            generated_at: new.generated_at,
            resolved_at: None,
            duration_minutes: 0.0,
            state: AlertState::Pending,
            resolution: None,
            resolution_message: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == AlertState::Pending
    }

    /// Apply a refresh in place
    pub fn apply_refresh(&mut self, refresh: &Refresh) {
        self.duration_minutes = refresh.duration_minutes;
    }

    /// Apply a resolution in place
    pub fn apply_resolve(&mut self, resolve: &Resolve) {
        self.state = AlertState::Resolved;
        self.resolved_at = Some(resolve.at);
        self.duration_minutes = resolve.duration_minutes;
        self.resolution = Some(resolve.cause);
        self.resolution_message = Some(resolve.message.clone());
    }
}

/// An alert to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub item_id: ItemId,
    pub kind: AlertKind,
    pub reading_id: Option<i64>,
    pub measured_value: Option<f64>,
    pub bounds: Option<Bounds>,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}

/// Duration refresh of a still-pending alert
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    pub id: AlertId,
    pub duration_minutes: f64,
}

/// Transition of a pending alert to resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Resolve {
    pub id: AlertId,
    pub at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub cause: ResolutionCause,
    pub message: String,
}

/// Batch of alert writes produced by one evaluation pass
///
/// Stores apply resolutions first, then refreshes, then creations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertChanges {
    pub resolve: Vec<Resolve>,
    pub refresh: Vec<Refresh>,
    pub open: Vec<NewAlert>,
}

impl AlertChanges {
    pub fn is_empty(&self) -> bool {
        self.resolve.is_empty() && self.refresh.is_empty() && self.open.is_empty()
    }
}

/// Minutes elapsed from `from` to `to`, never negative
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / 60_000.0).max(0.0)
}
