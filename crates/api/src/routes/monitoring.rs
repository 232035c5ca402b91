//! Monitoring Session Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pipeline::{PipelineError, StopReport};
use sensor_protocol::ItemId;
use std::sync::Arc;
use storage::{MonitoredItem, NewMonitoredItem};

use crate::{ApiError, AppState};

/// List all items, active and finished
pub async fn list_items(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MonitoredItem>>, ApiError> {
    let items = state
        .context
        .store()
        .list_items()
        .map_err(PipelineError::from)?;
    Ok(Json(items))
}

/// Start monitoring an item
pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewMonitoredItem>,
) -> Result<(StatusCode, Json<MonitoredItem>), ApiError> {
    let item = state.context.start_monitoring(new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Stop monitoring an item and close its pending alerts
pub async fn stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> Result<Json<StopReport>, ApiError> {
    Ok(Json(state.context.stop_monitoring(id).await?))
}
