//! Natural-language to SQL generation pipeline.

use crate::models::GeneratedSql;
use crate::services::lifecycle::ModelLifecycle;
use crate::services::metrics;
use crate::services::prompt::PromptBuilder;
use crate::services::providers::{BackendError, CompletionBackend};
use crate::services::sanitizer::{SanitizeError, SqlSanitizer};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

pub const NOT_LOADED_STATUS: &str = "Model not loaded. Please call /load-model first";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Backend(e) => e.into(),
            GenerationError::Sanitize(e) => AppError::Unprocessable {
                code: "incomplete_generation",
                message: e.to_string(),
            },
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(detail) => AppError::ServiceUnavailable(detail),
            BackendError::MalformedResponse(detail) => AppError::BadGateway(detail),
        }
    }
}

/// Outcome of a generation request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The model is not loaded; the backend was not called.
    NotLoaded,
    Generated(GeneratedSql),
}

/// Runs lifecycle check, prompt assembly, completion and sanitization.
pub struct SqlGenerator {
    lifecycle: Arc<ModelLifecycle>,
    backend: Arc<dyn CompletionBackend>,
    prompts: PromptBuilder,
    sanitizer: SqlSanitizer,
}

impl SqlGenerator {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        backend: Arc<dyn CompletionBackend>,
        prompts: PromptBuilder,
        sanitizer: SqlSanitizer,
    ) -> Self {
        Self {
            lifecycle,
            backend,
            prompts,
            sanitizer,
        }
    }

    #[tracing::instrument(skip(self, schema), fields(query_len = query.len()))]
    pub async fn generate(
        &self,
        query: &str,
        schema: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<GenerateOutcome, GenerationError> {
        if !self.lifecycle.is_loaded() {
            tracing::warn!("SQL generation requested before model load");
            metrics::record_generation("not_loaded");
            return Ok(GenerateOutcome::NotLoaded);
        }

        let prompt = self.prompts.build(query, schema);

        let raw = self.backend.complete(&prompt, request_id).await.map_err(|e| {
            tracing::error!(error = %e, "Completion request failed");
            metrics::record_generation("backend_error");
            e
        })?;
        tracing::info!(raw_sql = %raw, "Received raw completion");

        let generated = self.sanitizer.sanitize(&raw).map_err(|e| {
            tracing::warn!(raw_sql = %raw, "Discarding incomplete generation");
            metrics::record_generation("incomplete");
            e
        })?;
        tracing::info!(sql = %generated.sql, "Generated SQL");
        metrics::record_generation("success");

        Ok(GenerateOutcome::Generated(generated))
    }
}
