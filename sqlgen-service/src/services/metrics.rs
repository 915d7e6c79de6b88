//! Prometheus metrics for sqlgen-service.
//!
//! HTTP request metrics come from `service_core::middleware::metrics_middleware`;
//! this module adds model-load and generation outcomes and renders everything
//! for the `/metrics` endpoint.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder already installed; metrics detached");
            PrometheusBuilder::new().build_recorder().handle()
        }
    });
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a model load attempt by outcome (`success` / `failure`).
pub fn record_model_load(outcome: &'static str) {
    counter!("sqlgen_model_loads_total", "outcome" => outcome).increment(1);
}

/// Count a generation request by outcome.
pub fn record_generation(outcome: &'static str) {
    counter!("sqlgen_generations_total", "outcome" => outcome).increment(1);
}
