//! Poll Loop Implementation

use alerting::AlertStore;
use pipeline::{IngestReport, MonitorContext, PipelineError};
use sensor_protocol::{DeviceError, IndicatorDevice, RawReading, ReadingSource, StatusColor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storage::{ItemCatalog, ReadingStore};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Configuration for the poll loops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between device fetches (slow loop)
    pub fetch_interval_secs: u64,
    /// Seconds between indicator updates (fast loop)
    pub indicator_interval_secs: u64,
    /// Pause after a failed iteration in milliseconds
    pub backoff_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: 30,
            indicator_interval_secs: 3,
            backoff_ms: 1000,
        }
    }
}

impl PollerConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs.max(1))
    }

    pub fn indicator_interval(&self) -> Duration {
        Duration::from_secs(self.indicator_interval_secs.max(1))
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Failure of one loop iteration
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Indicator device error: {0}")]
    Device(#[from] DeviceError),
}

/// Drives a monitor context from the device on two cadences
pub struct Poller<S> {
    context: Arc<MonitorContext<S>>,
    config: PollerConfig,
}

impl<S> Poller<S>
where
    S: AlertStore + ReadingStore + ItemCatalog,
{
    pub fn new(context: Arc<MonitorContext<S>>, config: PollerConfig) -> Self {
        Self { context, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Fetch one reading and ingest it
    ///
    /// A failed fetch is ingested as a reading with every channel absent.
    pub async fn fetch_once<R: ReadingSource>(&self, source: &R) -> Result<IngestReport, PipelineError> {
        let raw = match source.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Sensor fetch failed, every channel treated as absent: {}", e);
                RawReading::default()
            }
        };
        self.context.ingest(raw).await
    }

    /// Re-evaluate the color and push it to the indicator
    pub async fn indicate_once<D: IndicatorDevice>(&self, device: &D) -> Result<StatusColor, PollError> {
        let decision = self.context.refresh_status().await?;
        device.send(decision.color.into()).await?;
        debug!("Indicator set to {}", decision.color);
        Ok(decision.color)
    }

    /// Slow loop: fetch, persist and alert until shutdown
    pub async fn run_fetch_loop<R: ReadingSource>(&self, source: &R, mut shutdown: watch::Receiver<bool>) {
        info!("Starting fetch loop (every {:?})", self.config.fetch_interval());
        let mut ticker = tokio::time::interval(self.config.fetch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            match self.fetch_once(source).await {
                Ok(report) => debug!("Fetch cycle done: {}", report.status_line()),
                Err(e) => {
                    warn!("Fetch cycle failed: {}", e);
                    if Self::pause(self.config.backoff(), &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Fetch loop stopped");
    }

    /// Fast loop: recompute and push the indicator color until shutdown
    pub async fn run_indicator_loop<D: IndicatorDevice>(&self, device: &D, mut shutdown: watch::Receiver<bool>) {
        info!("Starting indicator loop (every {:?})", self.config.indicator_interval());
        let mut ticker = tokio::time::interval(self.config.indicator_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            if let Err(e) = self.indicate_once(device).await {
                warn!("Indicator cycle failed: {}", e);
                if Self::pause(self.config.backoff(), &mut shutdown).await {
                    break;
                }
            }
        }

        info!("Indicator loop stopped");
    }

    /// Sleep for `backoff`; returns true if shutdown was requested meanwhile
    async fn pause(backoff: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(backoff) => false,
            _ = shutdown.changed() => true,
        }
    }
}
