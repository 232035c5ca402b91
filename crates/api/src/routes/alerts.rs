//! Alert Routes

use alerting::{Alert, AlertId, AlertState, AlertStore};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::AlertFilter;

use crate::{ApiError, AppState};

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Filter by state (pending or resolved)
    pub state: Option<AlertState>,
    /// Filter by monitored item
    pub item_id: Option<i64>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<Alert>,
    pub count: usize,
    pub pending_count: usize,
}

/// List alerts, most recent first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let store = state.context.store();
    let filter = AlertFilter {
        state: params.state,
        item_id: params.item_id,
    };

    let data = store
        .list_alerts(filter, params.limit.min(500))
        .map_err(PipelineError::from)?;
    let pending_count = store.pending_count().map_err(PipelineError::from)?;

    Ok(Json(AlertResponse {
        count: data.len(),
        pending_count,
        data,
    }))
}

/// Resolve an alert by hand
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.context.resolve_alert(id).await?))
}
