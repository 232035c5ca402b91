//! Indicator Status Route

use axum::{extract::State, Json};
use pipeline::StatusSnapshot;
use serde::Serialize;
use std::sync::Arc;
use storage::{ItemCatalog, MonitoredItem};

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub active_item: Option<MonitoredItem>,
}

/// Re-evaluate and return the current indicator status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    state.context.refresh_status().await?;
    let snapshot = state.context.status_snapshot().await;
    let active_item = state
        .context
        .store()
        .active_item()
        .map_err(pipeline::PipelineError::from)?;

    Ok(Json(StatusResponse {
        snapshot,
        active_item,
    }))
}
