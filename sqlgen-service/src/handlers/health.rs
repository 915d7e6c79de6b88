use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::models::HealthStatus;
use crate::services::metrics;
use crate::startup::AppState;

/// Service liveness for Docker/K8s probes.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "sqlgen-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the model has been loaded.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.lifecycle.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Model health: always answers, reflecting the current load state.
#[tracing::instrument(skip(state))]
pub async fn model_health(State(state): State<AppState>) -> Json<HealthStatus> {
    let health = state.lifecycle.health();
    tracing::info!(model_loaded = health.model_loaded, "Health check");
    Json(health)
}

pub async fn metrics_endpoint() -> String {
    metrics::get_metrics()
}
