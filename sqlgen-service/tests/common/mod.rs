#![allow(dead_code)]

use service_core::config::Config as CoreConfig;
use sqlgen_service::config::{ApiConfig, PromptConfig, SanitizerConfig, SqlgenConfig, VllmSettings};
use sqlgen_service::startup::Application;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SQL_TEMPLATE: &str = "{system_prompt}\n\n### Question:\n{context}\n\n### SQL:\n";
pub const SYSTEM_PROMPT: &str = "You translate questions into SQL.";

/// A running service wired to a mock vLLM server.
pub struct TestApp {
    pub address: String,
    pub api_address: String,
    pub http_port: u16,
    pub vllm: MockServer,
    pub client: reqwest::Client,
}

pub fn test_config(vllm_url: &str) -> SqlgenConfig {
    SqlgenConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            ..CoreConfig::default()
        },
        vllm: VllmSettings {
            base_url: vllm_url.to_string(),
            model: "/model".to_string(),
            timeout_secs: 5,
        },
        api: ApiConfig {
            prefix: "/api/v1".to_string(),
            allowed_origins: vec!["*".to_string()],
        },
        prompts: PromptConfig {
            system_prompt: SYSTEM_PROMPT.to_string(),
            sql_template: SQL_TEMPLATE.to_string(),
        },
        sanitizer: SanitizerConfig {
            truncate_at: vec!["\n\n".to_string(), "Comment:".to_string()],
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let vllm = MockServer::start().await;

        let app = Application::build(test_config(&vllm.uri()))
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let address = format!("http://127.0.0.1:{}", http_port);
        let api_address = format!("{}/api/v1", address);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            api_address,
            http_port,
            vllm,
            client,
        }
    }

    /// Make the mock vLLM answer the readiness probe with `status`.
    pub async fn mock_models(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"id": "/model", "object": "model"}]
            })))
            .mount(&self.vllm)
            .await;
    }

    /// Make the mock vLLM complete every prompt with `text`.
    pub async fn mock_completion(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cmpl-test",
                "object": "text_completion",
                "model": "/model",
                "choices": [{"index": 0, "text": text, "finish_reason": "stop"}]
            })))
            .mount(&self.vllm)
            .await;
    }

    pub async fn load_model(&self) -> reqwest::Response {
        self.client
            .post(format!("{}/load-model", self.api_address))
            .send()
            .await
            .expect("Failed to send load-model request")
    }

    pub async fn generate_sql(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/generate-sql", self.api_address))
            .json(&body)
            .send()
            .await
            .expect("Failed to send generate-sql request")
    }

    /// Number of requests the mock vLLM received on `path`.
    pub async fn vllm_requests(&self, request_path: &str) -> usize {
        self.vllm
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}
