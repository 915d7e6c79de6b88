//! Completion backend abstraction and implementations.
//!
//! The service talks to a single OpenAI-compatible completion server (vLLM).
//! The trait keeps the HTTP client swappable for a call-counting mock in tests.

pub mod mock;
pub mod vllm;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for backend operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection failure, timeout or non-success status.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Success status but an unusable body.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    /// The failure detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            BackendError::Unavailable(detail) | BackendError::MalformedResponse(detail) => detail,
        }
    }
}

pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_STOP_SEQUENCES: [&str; 3] = ["###", "Comment:", "\n\n"];

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            stop: DEFAULT_STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// An inference server able to report readiness and complete prompts.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Readiness probe against the model-listing endpoint.
    ///
    /// `request_id` is the inbound request's correlation ID, forwarded so
    /// backend logs can be matched to it.
    async fn probe(&self, request_id: Option<&str>) -> Result<(), BackendError>;

    /// Complete `prompt` and return the first choice's text verbatim.
    async fn complete(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<String, BackendError>;
}
