use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Unprocessable entity: {code}: {message}")]
    Unprocessable { code: &'static str, message: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Status code, stable machine-readable code, message and optional details.
    fn parts(&self) -> (StatusCode, &'static str, String, Option<String>) {
        match self {
            AppError::ValidationError(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Validation error".to_string(),
                Some(err.to_string()),
            ),
            AppError::Unprocessable { code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                *code,
                "Unprocessable entity".to_string(),
                Some(message.clone()),
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
            ),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "Bad Gateway".to_string(),
                Some(msg.clone()),
            ),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "backend_unavailable",
                "Service unavailable".to_string(),
                Some(msg.clone()),
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error, details) = self.parts();

        (
            status,
            Json(ErrorResponse {
                error,
                code,
                details,
            }),
        )
            .into_response()
    }
}
