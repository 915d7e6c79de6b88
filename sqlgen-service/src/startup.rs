//! Application startup and lifecycle management.
//!
//! Builds the shared state (backend client, load tracker, generation
//! pipeline), the HTTP router, and binds the listener.

use crate::config::SqlgenConfig;
use crate::handlers::{
    generate_sql, health_check, load_model, metrics_endpoint, model_health, readiness_check,
};
use crate::services::providers::vllm::VllmClient;
use crate::services::{CompletionBackend, ModelLifecycle, SqlGenerator};
use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use service_core::observability::REQUEST_ID_HEADER;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: SqlgenConfig,
    pub lifecycle: Arc<ModelLifecycle>,
    pub generator: Arc<SqlGenerator>,
}

impl AppState {
    /// Wire the tracker and generation pipeline around `backend`.
    pub fn new(config: SqlgenConfig, backend: Arc<dyn CompletionBackend>) -> Result<Self, AppError> {
        let lifecycle = Arc::new(ModelLifecycle::new(backend.clone()));
        let generator = Arc::new(SqlGenerator::new(
            lifecycle.clone(),
            backend,
            config.prompt_builder()?,
            config.sanitizer(),
        ));

        Ok(Self {
            config,
            lifecycle,
            generator,
        })
    }
}

/// Build the HTTP router: service probes at the root, model endpoints under
/// the configured prefix.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.api.prefix.clone();

    let api = Router::new()
        .route("/health", get(model_health))
        .route("/load-model", post(load_model))
        .route("/generate-sql", post(generate_sql));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .nest(&prefix, api)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.api.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    layer.allow_origin(
        allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                    None
                }
            })
            .collect::<Vec<HeaderValue>>(),
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against the configured vLLM server.
    pub async fn build(config: SqlgenConfig) -> Result<Self, AppError> {
        let client = VllmClient::new(config.vllm_config()).map_err(|e| {
            tracing::error!("Failed to create vLLM client: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;
        tracing::info!(
            base_url = %client.base_url(),
            model = %config.vllm.model,
            "Initialized vLLM client"
        );

        Self::build_with_backend(config, Arc::new(client)).await
    }

    /// Build the application around an arbitrary backend.
    pub async fn build_with_backend(
        config: SqlgenConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), backend)?;

        // Port 0 binds a random port for testing
        let http_addr = config.common.bind_address();
        let http_listener = TcpListener::bind(&http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            "SQL generation service: HTTP on port {}, API prefix {}",
            http_port,
            config.api.prefix
        );

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending::<()>()).await
    }

    /// Run until `shutdown` resolves, draining in-flight requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);

        axum::serve(self.http_listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
