//! Alert Manager Implementation

use crate::error::AlertError;
use crate::store::AlertStore;
use crate::types::{
    minutes_between, Alert, AlertChanges, AlertId, AlertKind, NewAlert, Refresh, ResolutionCause,
    Resolve,
};
use chrono::{DateTime, Utc};
use data_validator::evaluate;
use sensor_protocol::{Bounds, ItemId, RangeProfile, Reading};
use sensor_tracker::SensorStatus;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one evaluation pass changed
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Alerts created in this pass
    pub opened: Vec<Alert>,
    /// Pending alerts whose duration was refreshed
    pub refreshed: Vec<AlertId>,
    /// Alerts resolved in this pass
    pub resolved: Vec<AlertId>,
}

/// Evidence for an alert that should be pending after this pass
#[derive(Debug, Clone, Copy)]
struct Breach {
    value: Option<f64>,
    bounds: Option<Bounds>,
}

/// Alert lifecycle manager
///
/// Keeps at most one pending alert per (item, kind) key. Range breaches and
/// sensor availability problems are tracked under independent keys.
pub struct AlertManager<S> {
    store: Arc<S>,
}

impl<S: AlertStore> AlertManager<S> {
    /// Create a new alert manager writing through `store`
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of pending alerts across all items
    pub fn pending_count(&self) -> Result<usize, AlertError> {
        self.store.pending_count()
    }

    /// Run one evaluation pass for the active item and persist the result
    ///
    /// Alerts opened in this pass are linked to `reading_id`, the stored
    /// reading that triggered them.
    pub fn process(
        &self,
        item_id: ItemId,
        profile: &RangeProfile,
        reading: &Reading,
        reading_id: Option<i64>,
        status: &SensorStatus,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome, AlertError> {
        let pending = self.store.pending_for_item(item_id)?;
        let changes = Self::plan(&pending, item_id, profile, reading, reading_id, status, now);

        if changes.is_empty() {
            debug!("No alert changes for item {}", item_id);
            return Ok(CycleOutcome::default());
        }

        let opened = self.store.apply(&changes)?;

        for resolve in &changes.resolve {
            info!("Alert {} resolved: {}", resolve.id, resolve.message);
        }
        for alert in &opened {
            warn!("Alert {} opened: {}", alert.id, alert.message);
        }

        Ok(CycleOutcome {
            opened,
            refreshed: changes.refresh.iter().map(|r| r.id).collect(),
            resolved: changes.resolve.iter().map(|r| r.id).collect(),
        })
    }

    /// Compute the writes for one evaluation pass against the current pending set
    pub fn plan(
        pending: &[Alert],
        item_id: ItemId,
        profile: &RangeProfile,
        reading: &Reading,
        reading_id: Option<i64>,
        status: &SensorStatus,
        now: DateTime<Utc>,
    ) -> AlertChanges {
        let desired = Self::desired_alerts(profile, reading, status);
        let device_down = desired.contains_key(&AlertKind::DeviceUnreachable);
        let mut changes = AlertChanges::default();

        // One canonical pending alert per kind; the oldest wins
        let mut canonical: BTreeMap<AlertKind, &Alert> = BTreeMap::new();
        let mut sorted: Vec<&Alert> = pending
            .iter()
            .filter(|a| a.item_id == item_id && a.is_pending())
            .collect();
        sorted.sort_by_key(|a| (a.generated_at, a.id));

        for alert in sorted {
            if canonical.contains_key(&alert.kind) || !desired.contains_key(&alert.kind) {
                // A critical channel still down is covered by the device alert
                let cause = match alert.kind {
                    AlertKind::ChannelUnreachable(p) if device_down && p.is_critical() => {
                        ResolutionCause::Superseded
                    }
                    _ => ResolutionCause::Automatic,
                };
                changes.resolve.push(Self::resolution(alert, now, cause));
            } else {
                canonical.insert(alert.kind, alert);
            }
        }

        for (kind, breach) in desired {
            match canonical.get(&kind) {
                Some(existing) => changes.refresh.push(Refresh {
                    id: existing.id,
                    duration_minutes: minutes_between(existing.generated_at, now),
                }),
                None => changes.open.push(NewAlert {
                    item_id,
                    kind,
                    reading_id,
                    measured_value: breach.value,
                    bounds: breach.bounds,
                    message: open_message(kind, breach),
                    generated_at: now,
                }),
            }
        }

        changes
    }

    /// Resolve one alert, e.g. on operator request
    pub fn resolve(
        &self,
        id: AlertId,
        now: DateTime<Utc>,
        cause: ResolutionCause,
    ) -> Result<Alert, AlertError> {
        let mut alert = self.store.alert(id)?.ok_or(AlertError::NotFound(id))?;
        if !alert.is_pending() {
            return Err(AlertError::AlreadyResolved(id));
        }

        let resolve = Self::resolution(&alert, now, cause);
        self.store.apply(&AlertChanges {
            resolve: vec![resolve.clone()],
            ..Default::default()
        })?;

        info!("Alert {} resolved: {}", id, resolve.message);
        alert.apply_resolve(&resolve);
        Ok(alert)
    }

    /// Resolve every pending alert of an item through the same resolution path
    pub fn resolve_all_for_item(
        &self,
        item_id: ItemId,
        now: DateTime<Utc>,
        cause: ResolutionCause,
    ) -> Result<Vec<AlertId>, AlertError> {
        let pending = self.store.pending_for_item(item_id)?;
        let changes = AlertChanges {
            resolve: pending
                .iter()
                .map(|a| Self::resolution(a, now, cause))
                .collect(),
            ..Default::default()
        };

        if !changes.is_empty() {
            self.store.apply(&changes)?;
            info!(
                "Resolved {} pending alert(s) for item {}",
                changes.resolve.len(),
                item_id
            );
        }

        Ok(changes.resolve.iter().map(|r| r.id).collect())
    }

    /// Alerts that must be pending after evaluating this reading
    fn desired_alerts(
        profile: &RangeProfile,
        reading: &Reading,
        status: &SensorStatus,
    ) -> BTreeMap<AlertKind, Breach> {
        let mut desired = BTreeMap::new();

        for parameter in evaluate(reading, profile) {
            desired.insert(
                AlertKind::OutOfRange(parameter),
                Breach {
                    value: reading.value(parameter),
                    bounds: Some(profile.bounds(parameter)),
                },
            );
        }

        let unavailable = Breach {
            value: None,
            bounds: None,
        };
        // The device alert replaces the critical channels only
        let device_down = status.all_failed();
        if device_down {
            desired.insert(AlertKind::DeviceUnreachable, unavailable);
        }
        for parameter in status.failed() {
            if !(device_down && parameter.is_critical()) {
                desired.insert(AlertKind::ChannelUnreachable(parameter), unavailable);
            }
        }

        desired
    }

    fn resolution(alert: &Alert, now: DateTime<Utc>, cause: ResolutionCause) -> Resolve {
        let minutes = minutes_between(alert.generated_at, now);
        Resolve {
            id: alert.id,
            at: now,
            duration_minutes: minutes,
            cause,
            message: resolve_message(alert.kind, cause, minutes),
        }
    }
}

fn open_message(kind: AlertKind, breach: Breach) -> String {
    match (kind, breach.value, breach.bounds) {
        (AlertKind::OutOfRange(p), Some(value), Some(bounds)) => format!(
            "Alert: {} out of range at {:.1} {} (allowed {:.1} to {:.1} {})",
            p,
            value,
            p.unit(),
            bounds.min,
            bounds.max,
            p.unit()
        ),
        (AlertKind::ChannelUnreachable(p), _, _) => {
            format!("Alert: {} sensor is not reporting", p)
        }
        (AlertKind::DeviceUnreachable, _, _) => {
            "Alert: sensor device unreachable, temperature and humidity are not reporting"
                .to_string()
        }
        (kind, _, _) => format!("Alert: {}", kind),
    }
}

fn resolve_message(kind: AlertKind, cause: ResolutionCause, minutes: f64) -> String {
    match (cause, kind) {
        (ResolutionCause::Automatic, AlertKind::OutOfRange(p)) => {
            format!("Resolved: {} back within range after {:.1} min", p, minutes)
        }
        (ResolutionCause::Automatic, AlertKind::ChannelUnreachable(p)) => {
            format!("Resolved: {} sensor reporting again after {:.1} min", p, minutes)
        }
        (ResolutionCause::Automatic, AlertKind::DeviceUnreachable) => {
            format!("Resolved: sensor device reachable again after {:.1} min", minutes)
        }
        (ResolutionCause::Superseded, _) => format!(
            "Resolved: {} superseded by device unreachable after {:.1} min",
            kind, minutes
        ),
        (ResolutionCause::Manual, _) => {
            format!("Resolved manually: {} after {:.1} min", kind, minutes)
        }
        (ResolutionCause::SessionEnded, _) => format!(
            "Resolved: monitoring session ended, {} lasted {:.1} min",
            kind, minutes
        ),
    }
}
