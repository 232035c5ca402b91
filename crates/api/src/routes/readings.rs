//! Reading Ingestion Route

use axum::{extract::State, Json};
use sensor_protocol::{Parameter, RawReading, StatusColor};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Response returned to the posting device
#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub status_color: StatusColor,
    pub status: String,
    pub stored: bool,
    pub lockout: bool,
    pub failed_sensors: BTreeSet<Parameter>,
    pub rejected: Vec<Parameter>,
    pub alerts_opened: usize,
    pub alerts_resolved: usize,
}

/// Ingest a reading pushed by the device
pub async fn post_reading(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawReading>,
) -> Result<Json<ReadingResponse>, ApiError> {
    let report = state.context.ingest(raw).await?;

    Ok(Json(ReadingResponse {
        status_color: report.color,
        status: report.status_line(),
        stored: report.stored(),
        lockout: report.lockout,
        alerts_opened: report.opened.len(),
        alerts_resolved: report.resolved.len(),
        failed_sensors: report.failed_sensors,
        rejected: report.rejected,
    }))
}
