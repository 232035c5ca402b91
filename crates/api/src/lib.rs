//! Cold-Chain Monitor API Server
//!
//! REST API for sensor ingestion, indicator status, alerts and monitoring
//! sessions, plus the service wiring used by the binary.

use alerting::AlertStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use pipeline::{MonitorContext, SystemClock};
use poller::Poller;
use sensor_protocol::SensorClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use storage::Repository;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};

mod error;
mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{AppConfig, LoggingConfig, RunMode, ServerConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Monitoring core
    pub context: Arc<MonitorContext<Repository>>,
    /// Prometheus render handle, when a recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(context: Arc<MonitorContext<Repository>>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            context,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub sensor: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub last_activity: Option<String>,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub reading_count: usize,
    pub alert_count: usize,
    pub pending_alerts: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/readings", post(routes::readings::post_reading))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/alerts/:id/resolve", post(routes::alerts::resolve_alert))
        .route(
            "/api/v1/monitoring",
            get(routes::monitoring::list_items).post(routes::monitoring::start),
        )
        .route("/api/v1/monitoring/:id/stop", post(routes::monitoring::stop))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let context = &state.context;
    let snapshot = context.status_snapshot().await;
    let repository = context.store();

    let (database, pending_alerts) = match repository.pending_count() {
        Ok(count) => ("ok", count),
        Err(e) => {
            warn!("Health check could not read alerts: {}", e);
            ("error", 0)
        }
    };
    let sensor = if snapshot.fresh { "ok" } else { "stale" };

    let response = HealthResponse {
        status: if database == "ok" { "healthy" } else { "degraded" }.to_string(),
        timestamp: context.now().timestamp(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            sensor: ComponentHealth {
                status: sensor.to_string(),
                last_activity: snapshot.latest.map(|r| r.timestamp.to_rfc3339()),
            },
            database: ComponentHealth {
                status: database.to_string(),
                last_activity: None,
            },
        },
        metrics: SystemMetrics {
            reading_count: repository.reading_count(),
            alert_count: repository.alert_count(),
            pending_alerts,
        },
    };

    Json(response)
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Run the service until Ctrl-C
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let repository = Arc::new(Repository::new());
    let context = Arc::new(MonitorContext::new(
        repository,
        config.pipeline(),
        Arc::new(SystemClock),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut loops = Vec::new();

    if config.mode == RunMode::Poll {
        let client = Arc::new(if config.mock_device {
            SensorClient::mock()
        } else {
            SensorClient::new(config.device.clone())?
        });
        let poller = Arc::new(Poller::new(context.clone(), config.poller.clone()));
        info!("Poll mode: fetching from {}", client.config().base_url);

        loops.push(tokio::spawn({
            let (poller, client, shutdown) = (poller.clone(), client.clone(), shutdown_rx.clone());
            async move { poller.run_fetch_loop(&*client, shutdown).await }
        }));
        loops.push(tokio::spawn({
            let (poller, client, shutdown) = (poller.clone(), client.clone(), shutdown_rx.clone());
            async move { poller.run_indicator_loop(&*client, shutdown).await }
        }));
    }

    let state = Arc::new(AppState::new(context, metrics));
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for handle in loops {
        if let Err(e) = handle.await {
            warn!("Background loop ended abnormally: {}", e);
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use pipeline::PipelineConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn make_test_state() -> Arc<AppState> {
        let context = Arc::new(MonitorContext::new(
            Arc::new(Repository::new()),
            PipelineConfig::default(),
            Arc::new(SystemClock),
        ));
        Arc::new(AppState::new(context, None))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn item_body() -> Value {
        json!({
            "name": "Insulin",
            "location": "Cold room A",
            "profile": {
                "temperature": { "min": 2.0, "max": 8.0 },
                "humidity": { "min": 30.0, "max": 60.0 },
                "light": { "min": 0.0, "max": 200.0 },
                "pressure": { "min": 500.0, "max": 1100.0 }
            }
        })
    }

    fn reading_body(temperature: f64) -> Value {
        json!({ "temperature": temperature, "humidity": 45.0, "light": 100.0, "pressure": 870.0 })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(make_test_state());
        let (status, json) = send(&app, Method::GET, "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["sensor"]["status"], "stale");
        assert_eq!(json["metrics"]["pending_alerts"], 0);
    }

    #[tokio::test]
    async fn test_reading_without_active_item() {
        let app = create_router(make_test_state());
        let (status, json) = send(&app, Method::POST, "/api/v1/readings", Some(reading_body(9.0))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status_color"], "green");
        assert_eq!(json["stored"], false);
    }

    #[tokio::test]
    async fn test_legacy_field_names() {
        let app = create_router(make_test_state());
        send(&app, Method::POST, "/api/v1/monitoring", Some(item_body())).await;

        let body = json!({ "temperatura": 5.0, "humedad": 45.0, "lux": 100.0, "presion": 870.0 });
        let (status, json) = send(&app, Method::POST, "/api/v1/readings", Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status_color"], "green");
        assert_eq!(json["stored"], true);
        assert_eq!(json["failed_sensors"], json!([]));
    }

    #[tokio::test]
    async fn test_single_active_item() {
        let app = create_router(make_test_state());
        let (status, json) = send(&app, Method::POST, "/api/v1/monitoring", Some(item_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["id"], 1);

        let (status, _) = send(&app, Method::POST, "/api/v1/monitoring", Some(item_body())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&app, Method::GET, "/api/v1/monitoring", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(|a| a.len()), Some(1));
    }

    #[tokio::test]
    async fn test_alert_lifecycle_over_http() {
        let app = create_router(make_test_state());
        send(&app, Method::POST, "/api/v1/monitoring", Some(item_body())).await;

        let (_, json) = send(&app, Method::POST, "/api/v1/readings", Some(reading_body(9.0))).await;
        assert_eq!(json["status_color"], "red");
        assert_eq!(json["lockout"], true);
        assert_eq!(json["alerts_opened"], 1);

        let (status, json) = send(&app, Method::GET, "/api/v1/alerts?state=pending", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        let id = json["data"][0]["id"].as_i64().unwrap();
        assert_eq!(json["data"][0]["kind"]["kind"], "out_of_range");

        let (_, json) = send(&app, Method::GET, "/api/v1/status", None).await;
        assert_eq!(json["color"], "red");
        assert_eq!(json["active_item"]["name"], "Insulin");

        let uri = format!("/api/v1/alerts/{}/resolve", id);
        let (status, json) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "resolved");
        assert_eq!(json["resolution"], "manual");

        let (status, _) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::POST, "/api/v1/alerts/999/resolve", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = send(&app, Method::GET, "/api/v1/status", None).await;
        assert_eq!(json["lockout"], false);
    }

    #[tokio::test]
    async fn test_stop_monitoring_over_http() {
        let app = create_router(make_test_state());
        send(&app, Method::POST, "/api/v1/monitoring", Some(item_body())).await;
        send(&app, Method::POST, "/api/v1/readings", Some(reading_body(9.0))).await;

        let (status, json) = send(&app, Method::POST, "/api/v1/monitoring/1/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["resolved"].as_array().map(|a| a.len()), Some(1));

        let (status, _) = send(&app, Method::POST, "/api/v1/monitoring/1/stop", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::POST, "/api/v1/monitoring/7/stop", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = send(&app, Method::GET, "/api/v1/alerts?state=pending", None).await;
        assert_eq!(json["pending_count"], 0);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let app = create_router(make_test_state());
        let (status, _) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
