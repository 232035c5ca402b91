//! Repository Implementation

use crate::StorageError;
use alerting::{Alert, AlertChanges, AlertError, AlertId, AlertState, AlertStore};
use chrono::{DateTime, Utc};
use sensor_protocol::{ItemId, RangeProfile, Reading};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A catalog item under (or formerly under) environmental monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItem {
    pub id: ItemId,
    pub name: String,
    pub location: String,
    pub profile: RangeProfile,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl MonitoredItem {
    /// Whether the monitoring session is still running
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Request to start monitoring an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMonitoredItem {
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub profile: RangeProfile,
}

/// Stored reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: i64,
    pub item_id: ItemId,
    pub reading: Reading,
}

/// Filter for alert listings
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFilter {
    pub state: Option<AlertState>,
    pub item_id: Option<ItemId>,
}

/// Persistence of ingested readings
pub trait ReadingStore: Send + Sync {
    /// Store a reading for an item and return its id
    fn insert_reading(&self, item_id: ItemId, reading: &Reading) -> Result<i64, StorageError>;

    /// Drop a reading again when the rest of its ingestion failed
    fn remove_reading(&self, id: i64) -> Result<(), StorageError>;
}

/// Monitored items and their sessions
pub trait ItemCatalog: Send + Sync {
    /// The active item; when several are active the lowest id wins
    fn active_item(&self) -> Result<Option<MonitoredItem>, StorageError>;

    /// Get an item by id
    fn get_item(&self, item_id: ItemId) -> Result<MonitoredItem, StorageError>;

    /// Start monitoring an item; only one item may be active at a time
    fn start_monitoring(
        &self,
        new: NewMonitoredItem,
        now: DateTime<Utc>,
    ) -> Result<MonitoredItem, StorageError>;

    /// Mark an item's monitoring session as ended
    fn stop_monitoring(&self, item_id: ItemId, now: DateTime<Utc>) -> Result<MonitoredItem, StorageError>;
}

#[derive(Debug, Default)]
struct AlertTable {
    rows: BTreeMap<AlertId, Alert>,
    next_id: AlertId,
}

#[derive(Debug, Default)]
struct ItemTable {
    rows: BTreeMap<ItemId, MonitoredItem>,
    next_id: ItemId,
}

/// Repository for data access (in-memory implementation)
pub struct Repository {
    /// Reading log (in-memory, oldest first)
    readings: Mutex<VecDeque<ReadingRecord>>,
    /// Alerts by id
    alerts: Mutex<AlertTable>,
    /// Monitored items by id
    items: Mutex<ItemTable>,
    /// Max reading records (one week at one reading per 10 s)
    max_reading_records: usize,
    /// Next reading ID
    next_reading_id: Mutex<i64>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            readings: Mutex::new(VecDeque::with_capacity(10_000)),
            alerts: Mutex::new(AlertTable {
                next_id: 1,
                ..Default::default()
            }),
            items: Mutex::new(ItemTable {
                next_id: 1,
                ..Default::default()
            }),
            max_reading_records: 60_480,
            next_reading_id: Mutex::new(1),
        }
    }

    /// Override the reading retention limit
    pub fn with_reading_limit(mut self, limit: usize) -> Self {
        self.max_reading_records = limit.max(1);
        self
    }

    // ============ Monitoring Sessions ============

    /// Import an item as-is, without the single-active-item check
    ///
    /// Used when loading sessions created by another system.
    pub fn seed_item(&self, item: MonitoredItem) -> Result<(), StorageError> {
        let mut items = lock(&self.items)?;
        items.next_id = items.next_id.max(item.id + 1);
        debug!("Seeded item {}", item.id);
        items.rows.insert(item.id, item);
        Ok(())
    }

    /// All items, ordered by id
    pub fn list_items(&self) -> Result<Vec<MonitoredItem>, StorageError> {
        Ok(lock(&self.items)?.rows.values().cloned().collect())
    }

    // ============ Readings ============

    /// Get recent readings of an item, most recent first
    pub fn get_readings(&self, item_id: ItemId, limit: usize) -> Result<Vec<ReadingRecord>, StorageError> {
        let log = lock(&self.readings)?;
        Ok(log
            .iter()
            .rev()
            .filter(|r| r.item_id == item_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Get total reading count
    pub fn reading_count(&self) -> usize {
        self.readings.lock().map(|l| l.len()).unwrap_or(0)
    }

    // ============ Alerts ============

    /// List alerts, most recent first
    pub fn list_alerts(&self, filter: AlertFilter, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let alerts = lock(&self.alerts)?;
        Ok(alerts
            .rows
            .values()
            .rev()
            .filter(|a| filter.state.map_or(true, |s| a.state == s))
            .filter(|a| filter.item_id.map_or(true, |i| a.item_id == i))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Get total alert count
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.rows.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingStore for Repository {
    fn insert_reading(&self, item_id: ItemId, reading: &Reading) -> Result<i64, StorageError> {
        let mut log = lock(&self.readings)?;
        let mut id = lock(&self.next_reading_id)?;

        // Enforce retention
        while log.len() >= self.max_reading_records {
            log.pop_front();
        }

        let record = ReadingRecord {
            id: *id,
            item_id,
            reading: reading.clone(),
        };
        *id += 1;

        debug!("Inserted reading {} for item {}", record.id, item_id);
        let returned_id = record.id;
        log.push_back(record);
        Ok(returned_id)
    }

    fn remove_reading(&self, id: i64) -> Result<(), StorageError> {
        let mut log = lock(&self.readings)?;
        let index = log
            .iter()
            .rposition(|r| r.id == id)
            .ok_or(StorageError::NotFound)?;
        log.remove(index);
        debug!("Removed reading {}", id);
        Ok(())
    }
}

impl ItemCatalog for Repository {
    fn get_item(&self, item_id: ItemId) -> Result<MonitoredItem, StorageError> {
        lock(&self.items)?
            .rows
            .get(&item_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn start_monitoring(
        &self,
        new: NewMonitoredItem,
        now: DateTime<Utc>,
    ) -> Result<MonitoredItem, StorageError> {
        let mut items = lock(&self.items)?;

        if let Some(active) = items.rows.values().find(|i| i.is_active()) {
            warn!("Refusing to start monitoring '{}': item {} is active", new.name, active.id);
            return Err(StorageError::ActiveItemExists {
                id: active.id,
                name: active.name.clone(),
            });
        }

        let item = MonitoredItem {
            id: items.next_id,
            name: new.name,
            location: new.location,
            profile: new.profile,
            started_at: now,
            ended_at: None,
        };
        items.next_id += 1;
        items.rows.insert(item.id, item.clone());

        info!("Started monitoring item {} ('{}')", item.id, item.name);
        Ok(item)
    }

    fn stop_monitoring(&self, item_id: ItemId, now: DateTime<Utc>) -> Result<MonitoredItem, StorageError> {
        let mut items = lock(&self.items)?;
        let item = items.rows.get_mut(&item_id).ok_or(StorageError::NotFound)?;

        if !item.is_active() {
            return Err(StorageError::AlreadyStopped(item_id));
        }
        item.ended_at = Some(now);

        info!("Stopped monitoring item {} ('{}')", item.id, item.name);
        Ok(item.clone())
    }

    fn active_item(&self) -> Result<Option<MonitoredItem>, StorageError> {
        let items = lock(&self.items)?;
        let mut active = items.rows.values().filter(|i| i.is_active());
        let first = active.next().cloned();
        if active.next().is_some() {
            warn!("More than one item is being monitored; using item {:?}", first.as_ref().map(|i| i.id));
        }
        Ok(first)
    }
}

impl AlertStore for Repository {
    fn pending_for_item(&self, item_id: ItemId) -> Result<Vec<Alert>, AlertError> {
        let alerts = lock(&self.alerts)?;
        Ok(alerts
            .rows
            .values()
            .filter(|a| a.item_id == item_id && a.is_pending())
            .cloned()
            .collect())
    }

    fn pending_count(&self) -> Result<usize, AlertError> {
        let alerts = lock(&self.alerts)?;
        Ok(alerts.rows.values().filter(|a| a.is_pending()).count())
    }

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, AlertError> {
        Ok(lock(&self.alerts)?.rows.get(&id).cloned())
    }

    fn apply(&self, changes: &AlertChanges) -> Result<Vec<Alert>, AlertError> {
        let mut alerts = lock(&self.alerts)?;

        // Validate the whole batch before touching any row
        let referenced = changes
            .resolve
            .iter()
            .map(|r| r.id)
            .chain(changes.refresh.iter().map(|r| r.id));
        for id in referenced {
            match alerts.rows.get(&id) {
                Some(alert) if alert.is_pending() => {}
                Some(_) => return Err(AlertError::AlreadyResolved(id)),
                None => return Err(AlertError::NotFound(id)),
            }
        }

        for resolve in &changes.resolve {
            if let Some(alert) = alerts.rows.get_mut(&resolve.id) {
                alert.apply_resolve(resolve);
            }
        }
        for refresh in &changes.refresh {
            if let Some(alert) = alerts.rows.get_mut(&refresh.id) {
                alert.apply_refresh(refresh);
            }
        }

        let mut opened = Vec::with_capacity(changes.open.len());
        for new in &changes.open {
            let alert = Alert::from_new(alerts.next_id, new);
            alerts.next_id += 1;
            alerts.rows.insert(alert.id, alert.clone());
            opened.push(alert);
        }

        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertKind, NewAlert, Refresh, ResolutionCause, Resolve};
    use chrono::Duration;
    use sensor_protocol::Parameter;

    fn new_item(name: &str) -> NewMonitoredItem {
        NewMonitoredItem {
            name: name.to_string(),
            location: "Cold room A".to_string(),
            profile: RangeProfile::refrigerated(),
        }
    }

    fn new_alert(item_id: ItemId) -> NewAlert {
        NewAlert {
            item_id,
            kind: AlertKind::OutOfRange(Parameter::Temperature),
            reading_id: Some(1),
            measured_value: Some(8.4),
            bounds: None,
            message: "temperature out of range".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_active_item() {
        let repo = Repository::new();
        let item = repo.start_monitoring(new_item("Insulin"), Utc::now()).unwrap();
        assert_eq!(item.id, 1);

        let err = repo.start_monitoring(new_item("Vaccine"), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            StorageError::ActiveItemExists {
                id: 1,
                name: "Insulin".to_string()
            }
        );

        repo.stop_monitoring(1, Utc::now()).unwrap();
        let second = repo.start_monitoring(new_item("Vaccine"), Utc::now()).unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(repo.active_item().unwrap().unwrap().id, 2);
    }

    #[test]
    fn test_stop_twice_fails() {
        let repo = Repository::new();
        repo.start_monitoring(new_item("Insulin"), Utc::now()).unwrap();
        repo.stop_monitoring(1, Utc::now()).unwrap();
        assert_eq!(repo.stop_monitoring(1, Utc::now()), Err(StorageError::AlreadyStopped(1)));
        assert_eq!(repo.stop_monitoring(9, Utc::now()), Err(StorageError::NotFound));
    }

    #[test]
    fn test_first_active_item_wins_when_invariant_broken() {
        let repo = Repository::new();
        for id in [3, 2] {
            repo.seed_item(MonitoredItem {
                id,
                name: format!("item-{}", id),
                location: String::new(),
                profile: RangeProfile::refrigerated(),
                started_at: Utc::now(),
                ended_at: None,
            })
            .unwrap();
        }
        assert_eq!(repo.active_item().unwrap().unwrap().id, 2);
    }

    #[test]
    fn test_reading_insert_and_retrieve() {
        let repo = Repository::new();
        let reading = Reading::new(Utc::now()).with(Parameter::Temperature, 5.0);

        let id = repo.insert_reading(1, &reading).unwrap();
        assert_eq!(id, 1);

        let readings = repo.get_readings(1, 10).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].reading.temperature, Some(5.0));
        assert!(repo.get_readings(2, 10).unwrap().is_empty());

        repo.remove_reading(id).unwrap();
        assert_eq!(repo.reading_count(), 0);
        assert_eq!(repo.remove_reading(id), Err(StorageError::NotFound));
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::new().with_reading_limit(5);
        for i in 0..10 {
            let reading = Reading::new(Utc::now()).with(Parameter::Temperature, i as f64);
            repo.insert_reading(1, &reading).unwrap();
        }
        assert_eq!(repo.reading_count(), 5);
        assert_eq!(repo.get_readings(1, 1).unwrap()[0].reading.temperature, Some(9.0));
    }

    #[test]
    fn test_apply_creates_and_resolves() {
        let repo = Repository::new();
        let opened = repo
            .apply(&AlertChanges {
                open: vec![new_alert(1), new_alert(2)],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(opened.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(repo.pending_count().unwrap(), 2);
        assert_eq!(repo.pending_for_item(1).unwrap().len(), 1);

        let now = Utc::now() + Duration::minutes(5);
        repo.apply(&AlertChanges {
            resolve: vec![Resolve {
                id: 1,
                at: now,
                duration_minutes: 5.0,
                cause: ResolutionCause::Automatic,
                message: "back in range".to_string(),
            }],
            refresh: vec![Refresh {
                id: 2,
                duration_minutes: 5.0,
            }],
            open: vec![],
        })
        .unwrap();

        assert_eq!(repo.pending_count().unwrap(), 1);
        assert_eq!(repo.alert(2).unwrap().unwrap().duration_minutes, 5.0);

        let resolved = repo
            .list_alerts(
                AlertFilter {
                    state: Some(AlertState::Resolved),
                    item_id: None,
                },
                10,
            )
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, 1);
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let repo = Repository::new();
        repo.apply(&AlertChanges {
            open: vec![new_alert(1)],
            ..Default::default()
        })
        .unwrap();

        // Second refresh references a missing alert: nothing may change
        let result = repo.apply(&AlertChanges {
            refresh: vec![
                Refresh {
                    id: 1,
                    duration_minutes: 3.0,
                },
                Refresh {
                    id: 42,
                    duration_minutes: 3.0,
                },
            ],
            open: vec![new_alert(1)],
            ..Default::default()
        });

        assert_eq!(result, Err(AlertError::NotFound(42)));
        assert_eq!(repo.alert_count(), 1);
        assert_eq!(repo.alert(1).unwrap().unwrap().duration_minutes, 0.0);
    }
}
