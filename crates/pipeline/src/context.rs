//! Monitor Context Implementation

use crate::clock::Clock;
use crate::error::PipelineError;
use alerting::{Alert, AlertId, AlertManager, AlertStore, CycleOutcome, ResolutionCause};
use chrono::{DateTime, Utc};
use data_validator::{ValidationConfig, Validator};
use metrics::{counter, gauge};
use sensor_protocol::{ItemId, Parameter, RawReading, Reading, StatusColor};
use sensor_tracker::{SensorStatus, SensorTracker, TrackerConfig};
use serde::{Deserialize, Serialize};
use status_engine::{Decision, DecisionInput, StatusConfig, StatusEngine};
use std::collections::BTreeSet;
use std::sync::Arc;
use storage::{ItemCatalog, MonitoredItem, NewMonitoredItem, ReadingStore, StorageError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Configuration of the monitoring core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub validation: ValidationConfig,
    pub tracker: TrackerConfig,
    pub status: StatusConfig,
}

/// Result of ingesting one reading
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub color: StatusColor,
    pub lockout: bool,
    /// Item the reading was attributed to
    pub item_id: Option<ItemId>,
    /// Id of the stored reading; absent when no item is being monitored
    pub reading_id: Option<i64>,
    pub failed_sensors: BTreeSet<Parameter>,
    /// Channels dropped as physically implausible
    pub rejected: Vec<Parameter>,
    pub opened: Vec<AlertId>,
    pub resolved: Vec<AlertId>,
}

impl IngestReport {
    pub fn stored(&self) -> bool {
        self.reading_id.is_some()
    }

    /// Human-readable summary returned to the device
    pub fn status_line(&self) -> String {
        let stored = match (self.item_id, self.reading_id) {
            (Some(item), Some(id)) => format!("reading {} stored for item {}", id, item),
            _ => "no active item, reading not stored".to_string(),
        };

        if self.failed_sensors.is_empty() {
            format!("All sensors reporting; {}", stored)
        } else {
            let failed: Vec<&str> = self.failed_sensors.iter().map(|p| p.name()).collect();
            format!("Failed sensors: {}; {}", failed.join(", "), stored)
        }
    }
}

/// Point-in-time view of the indicator and sensor state
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub color: StatusColor,
    pub lockout: bool,
    pub sensors: SensorStatus,
    pub failed_sensors: BTreeSet<Parameter>,
    pub device_unreachable: bool,
    pub latest: Option<Reading>,
    /// Whether the latest reading is younger than the freshness timeout
    pub fresh: bool,
}

/// Result of stopping a monitoring session
#[derive(Debug, Clone, Serialize)]
pub struct StopReport {
    pub item: MonitoredItem,
    /// Alerts closed because the session ended
    pub resolved: Vec<AlertId>,
}

/// Monitoring state of one process
///
/// Every mutation (ingestion, status refresh, manual resolution, session
/// changes) runs under one writer lock, so the tracker and the indicator
/// state machine advance one complete transaction at a time. Readers see
/// either the previous or the next tracker, never a mix.
pub struct MonitorContext<S> {
    store: Arc<S>,
    alerts: AlertManager<S>,
    validator: Validator,
    tracker: RwLock<SensorTracker>,
    engine: Mutex<StatusEngine>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl<S> MonitorContext<S>
where
    S: AlertStore + ReadingStore + ItemCatalog,
{
    /// Create a context with fresh tracker and indicator state
    pub fn new(store: Arc<S>, config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            alerts: AlertManager::new(store.clone()),
            validator: Validator::new(config.validation.clone()),
            tracker: RwLock::new(SensorTracker::new()),
            engine: Mutex::new(StatusEngine::new(config.status.clone())),
            writer: Mutex::new(()),
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current evaluation time
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Copy of the committed tracker
    pub async fn tracker(&self) -> SensorTracker {
        self.tracker.read().await.clone()
    }

    /// Run one reading through validation, tracking, persistence, alerting
    /// and the status decision
    pub async fn ingest(&self, raw: RawReading) -> Result<IngestReport, PipelineError> {
        match self.run_ingest(raw).await {
            Ok(report) => {
                counter!("coldchain_readings_ingested_total").increment(1);
                counter!("coldchain_alerts_opened_total").increment(report.opened.len() as u64);
                counter!("coldchain_alerts_resolved_total").increment(report.resolved.len() as u64);
                Ok(report)
            }
            Err(e) => {
                counter!("coldchain_ingest_failures_total").increment(1);
                error!("Ingestion failed, state left unchanged: {}", e);
                Err(e)
            }
        }
    }

    async fn run_ingest(&self, raw: RawReading) -> Result<IngestReport, PipelineError> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();

        let validated = self.validator.sanitize(raw.into_reading(now));
        let rejected = validated.rejected();
        let reading = validated.reading;

        // Staged copy; committed only once persistence has succeeded
        let mut staged = self.tracker.read().await.clone();
        let failed_sensors = staged.update(&reading);

        // Every fallible read happens before the first write
        let item = self.store.active_item()?;
        let pending_before = self.alerts.pending_count()?;
        let (reading_id, outcome) = match &item {
            Some(item) => {
                let (id, outcome) = self.persist_and_alert(item, &reading, staged.status(), now)?;
                (Some(id), outcome)
            }
            None => {
                info!("No active monitored item: reading not stored, alerting skipped");
                (None, CycleOutcome::default())
            }
        };
        let pending_alerts =
            (pending_before + outcome.opened.len()).saturating_sub(outcome.resolved.len());

        *self.tracker.write().await = staged;

        let decision = self.decide(pending_alerts, item.as_ref()).await;
        debug!(
            "Ingested reading at {}: {} ({} pending alert(s))",
            reading.timestamp, decision.color, pending_alerts
        );

        Ok(IngestReport {
            color: decision.color,
            lockout: decision.lockout,
            item_id: item.map(|i| i.id),
            reading_id,
            failed_sensors,
            rejected,
            opened: outcome.opened.iter().map(|a| a.id).collect(),
            resolved: outcome.resolved,
        })
    }

    fn persist_and_alert(
        &self,
        item: &MonitoredItem,
        reading: &Reading,
        status: SensorStatus,
        now: DateTime<Utc>,
    ) -> Result<(i64, CycleOutcome), PipelineError> {
        let reading_id = self.store.insert_reading(item.id, reading)?;

        match self
            .alerts
            .process(item.id, &item.profile, reading, Some(reading_id), &status, now)
        {
            Ok(outcome) => Ok((reading_id, outcome)),
            Err(e) => {
                if let Err(rollback) = self.store.remove_reading(reading_id) {
                    error!("Failed to roll back reading {}: {}", reading_id, rollback);
                }
                Err(e.into())
            }
        }
    }

    /// Re-run the status decision on the committed state
    pub async fn refresh_status(&self) -> Result<Decision, PipelineError> {
        let _writer = self.writer.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Decision, PipelineError> {
        let pending_alerts = self.alerts.pending_count()?;
        let item = self.store.active_item()?;
        Ok(self.decide(pending_alerts, item.as_ref()).await)
    }

    async fn decide(&self, pending_alerts: usize, item: Option<&MonitoredItem>) -> Decision {
        let tracker = self.tracker.read().await;
        let mut engine = self.engine.lock().await;

        let decision = engine.decide(DecisionInput {
            pending_alerts,
            status: tracker.status(),
            reading: tracker.latest(),
            profile: item.map(|i| &i.profile),
        });
        gauge!("coldchain_status_color").set(decision.color.as_gauge());
        decision
    }

    /// Resolve an alert on operator request
    pub async fn resolve_alert(&self, id: AlertId) -> Result<Alert, PipelineError> {
        let _writer = self.writer.lock().await;
        let alert = self.alerts.resolve(id, self.clock.now(), ResolutionCause::Manual)?;
        counter!("coldchain_alerts_resolved_total").increment(1);

        if let Err(e) = self.refresh_locked().await {
            warn!("Status refresh after resolving alert {} failed: {}", id, e);
        }
        Ok(alert)
    }

    /// Start monitoring an item
    pub async fn start_monitoring(&self, new: NewMonitoredItem) -> Result<MonitoredItem, PipelineError> {
        let _writer = self.writer.lock().await;
        Ok(self.store.start_monitoring(new, self.clock.now())?)
    }

    /// End an item's session and close its pending alerts
    pub async fn stop_monitoring(&self, item_id: ItemId) -> Result<StopReport, PipelineError> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();

        if !self.store.get_item(item_id)?.is_active() {
            return Err(StorageError::AlreadyStopped(item_id).into());
        }

        let resolved = self
            .alerts
            .resolve_all_for_item(item_id, now, ResolutionCause::SessionEnded)?;
        counter!("coldchain_alerts_resolved_total").increment(resolved.len() as u64);
        let item = self.store.stop_monitoring(item_id, now)?;

        if let Err(e) = self.refresh_locked().await {
            warn!("Status refresh after stopping item {} failed: {}", item_id, e);
        }
        Ok(StopReport { item, resolved })
    }

    /// Current indicator and sensor state without running a decision
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let tracker = self.tracker.read().await;
        let engine = self.engine.lock().await;

        StatusSnapshot {
            color: engine.current(),
            lockout: engine.lockout_active(),
            sensors: tracker.status(),
            failed_sensors: tracker.get_failed(),
            device_unreachable: tracker.all_failed(),
            latest: tracker.latest().cloned(),
            fresh: tracker.is_fresh(self.clock.now(), self.config.tracker.freshness_timeout()),
        }
    }
}
