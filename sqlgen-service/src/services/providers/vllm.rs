//! vLLM completion backend.
//!
//! Uses the OpenAI-compatible REST surface exposed by `vllm serve`:
//! `GET /v1/models` as the readiness probe and `POST /v1/completions` for
//! generation.

use super::{BackendError, CompletionBackend, CompletionParams};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedRequestExt;
use std::time::Duration;

const MODELS_PATH: &str = "/v1/models";
const COMPLETIONS_PATH: &str = "/v1/completions";

/// vLLM client configuration.
#[derive(Debug, Clone)]
pub struct VllmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// HTTP client for a vLLM server.
pub struct VllmClient {
    config: VllmConfig,
    params: CompletionParams,
    client: Client,
}

impl VllmClient {
    pub fn new(config: VllmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            params: CompletionParams::default(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl CompletionBackend for VllmClient {
    async fn probe(&self, request_id: Option<&str>) -> Result<(), BackendError> {
        let url = self.url(MODELS_PATH);
        tracing::debug!(url = %url, "Probing vLLM readiness");

        let response = self
            .client
            .get(&url)
            .with_trace_context(request_id)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(BackendError::Unavailable(format!(
                "vLLM health check failed with status: {}",
                response.status()
            )))
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<String, BackendError> {
        let request = CompletionRequest {
            model: &self.config.model,
            prompt,
            params: &self.params,
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending completion request to vLLM"
        );

        let response = self
            .client
            .post(self.url(COMPLETIONS_PATH))
            .with_trace_context(request_id)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %error_text, "vLLM generation failed");

            return Err(BackendError::Unavailable(format!(
                "vLLM generation failed with status {}: {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        tracing::debug!(choices = completion.choices.len(), "Received vLLM completion");

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| BackendError::MalformedResponse("no choices".to_string()))
    }
}

// ============================================================================
// vLLM API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a CompletionParams,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> VllmClient {
        VllmClient::new(VllmConfig {
            base_url: base_url.to_string(),
            model: "/model".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            client("http://vllm:8000/").url(COMPLETIONS_PATH),
            "http://vllm:8000/v1/completions"
        );
        assert_eq!(
            client("http://vllm:8000").url(MODELS_PATH),
            "http://vllm:8000/v1/models"
        );
    }

    #[test]
    fn request_body_carries_fixed_sampling_parameters() {
        let params = CompletionParams::default();
        let body = serde_json::to_value(CompletionRequest {
            model: "/model",
            prompt: "list users",
            params: &params,
        })
        .unwrap();

        assert_eq!(body["model"], "/model");
        assert_eq!(body["prompt"], "list users");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["stop"], serde_json::json!(["###", "Comment:", "\n\n"]));
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!((body["top_p"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn missing_choices_deserialize_as_empty() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"id": "cmpl-1"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
