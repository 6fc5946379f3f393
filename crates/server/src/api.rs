//! HTTP API for diagnostics, alerts, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use diagnostics_core::{
    health::{ComponentStatus, HealthRegistry},
    observability::{DiagnosticsMetrics, StructuredLogger},
    Alert, DiagnosticsError, DiagnosticsService, DiagnosticsSnapshot,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DiagnosticsService>,
    pub health_registry: HealthRegistry,
    pub metrics: DiagnosticsMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: Arc<DiagnosticsService>,
        health_registry: HealthRegistry,
        metrics: DiagnosticsMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Error returned by API handlers.
///
/// Rendered as `{"error": <message>, "code": <CODE>}`.
#[derive(Debug)]
pub enum ApiError {
    Diagnostics(DiagnosticsError),
    /// The blocking task running the pipeline panicked or was cancelled
    Internal(String),
}

impl From<DiagnosticsError> for ApiError {
    fn from(err: DiagnosticsError) -> Self {
        ApiError::Diagnostics(err)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Diagnostics(err) => err.code(),
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Diagnostics(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Diagnostics(err) => err.to_string(),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Liveness banner
async fn root() -> impl IntoResponse {
    Json(json!({ "status": "running" }))
}

/// Diagnostics snapshot for the most recent sensor record
async fn diagnostics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DiagnosticsSnapshot>, ApiError> {
    let start = Instant::now();
    let service = state.service.clone();

    // File I/O and inference are synchronous
    let outcome = tokio::task::spawn_blocking(move || service.assemble_with_stats())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let elapsed = start.elapsed();
    state.metrics.observe_assemble_latency(elapsed.as_secs_f64());
    state.health_registry.record_dataset(&outcome).await;

    match outcome {
        Ok(assembled) => {
            let snapshot = assembled.snapshot;
            state
                .metrics
                .record_snapshot(snapshot.final_risk, snapshot.service_demand, assembled.records);
            state.logger.log_snapshot(
                &snapshot.vehicle_id,
                snapshot.final_risk,
                snapshot.service_demand,
                assembled.records,
                elapsed.as_millis(),
            );
            Ok(Json(snapshot))
        }
        Err(err) => {
            state.metrics.inc_diagnostics_error(err.code());
            state.logger.log_diagnostics_failed(err.code(), &err.to_string());
            Err(err.into())
        }
    }
}

/// Advisory alerts for the latest state; never fails, may be empty
async fn alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    let service = state.service.clone();

    let alerts = match tokio::task::spawn_blocking(move || service.alerts()).await {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(error = %e, "Alert derivation task failed");
            Vec::new()
        }
    };

    for alert in &alerts {
        state.metrics.inc_alert(alert.severity.as_str());
    }
    let highest = alerts
        .iter()
        .map(|a| a.severity)
        .max()
        .map(|s| s.as_str())
        .unwrap_or("none");
    state
        .logger
        .log_alerts(state.service.rule_set().as_str(), alerts.len(), highest);

    Json(alerts)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/alerts", get(alerts))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
