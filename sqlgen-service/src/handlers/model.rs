use axum::{extract::State, Extension, Json};
use service_core::error::AppError;
use service_core::middleware::RequestId;

use crate::models::StatusResponse;
use crate::startup::AppState;

/// Probe the backend and mark the model loaded.
#[tracing::instrument(skip(state, request_id), fields(request_id = %request_id.0))]
pub async fn load_model(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!(state = %state.lifecycle.state(), "Model load requested");

    let outcome = state.lifecycle.load(Some(&request_id.0)).await?;

    Ok(Json(StatusResponse::new(outcome.message())))
}
