use axum::{extract::State, Extension, Json};
use service_core::error::AppError;
use service_core::middleware::RequestId;
use validator::Validate;

use crate::models::{GenerateSqlRequest, GenerateSqlResponse, StatusResponse};
use crate::services::generator::NOT_LOADED_STATUS;
use crate::services::GenerateOutcome;
use crate::startup::AppState;

/// Generate SQL for a natural-language request.
///
/// Answers with a status object instead of an error while the model is not
/// loaded.
#[tracing::instrument(skip(state, request_id, request), fields(request_id = %request_id.0))]
pub async fn generate_sql(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<GenerateSqlRequest>,
) -> Result<Json<GenerateSqlResponse>, AppError> {
    request.validate()?;
    tracing::info!(query = %request.query, "SQL generation requested");

    let outcome = state
        .generator
        .generate(
            &request.query,
            request.schema.as_deref(),
            Some(&request_id.0),
        )
        .await?;

    let response = match outcome {
        GenerateOutcome::NotLoaded => {
            GenerateSqlResponse::Status(StatusResponse::new(NOT_LOADED_STATUS))
        }
        GenerateOutcome::Generated(sql) => GenerateSqlResponse::Generated(sql),
    };

    Ok(Json(response))
}
