//! Model load-state tracking.
//!
//! The backend has no explicit "load" call; a successful readiness probe is
//! taken as proof the model is served. Concurrent callers during a probe are
//! told to retry rather than queued behind it.

use crate::models::{HealthStatus, LoadState};
use crate::services::metrics;
use crate::services::providers::{BackendError, CompletionBackend};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of a load request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The model was already loaded; nothing was done.
    AlreadyLoaded,
    /// Another caller's probe is outstanding; nothing was done.
    InProgress,
    /// This call probed the backend and the model is now loaded.
    Loaded,
}

impl LoadOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            LoadOutcome::AlreadyLoaded => "Model already loaded",
            LoadOutcome::InProgress => "Model is currently loading",
            LoadOutcome::Loaded => "Model loaded successfully",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: LoadState,
    last_error: Option<String>,
}

/// Tri-state load tracker shared by all requests.
///
/// Every read and transition happens under one mutex, which is never held
/// across an await.
pub struct ModelLifecycle {
    backend: Arc<dyn CompletionBackend>,
    inner: Mutex<Inner>,
}

impl ModelLifecycle {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoadState {
        self.lock().state
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// Detail of the most recent failed load attempt.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::from_state(self.state())
    }

    #[tracing::instrument(skip(self))]
    pub async fn load(&self, request_id: Option<&str>) -> Result<LoadOutcome, BackendError> {
        {
            let mut inner = self.lock();
            match inner.state {
                LoadState::Loaded => return Ok(LoadOutcome::AlreadyLoaded),
                LoadState::Loading => return Ok(LoadOutcome::InProgress),
                LoadState::NotLoaded => inner.state = LoadState::Loading,
            }
        }

        let attempt = LoadAttempt {
            lifecycle: self,
            settled: false,
        };

        match self.backend.probe(request_id).await {
            Ok(()) => {
                attempt.settle(LoadState::Loaded, None);
                tracing::info!("Model loaded");
                metrics::record_model_load("success");
                Ok(LoadOutcome::Loaded)
            }
            Err(e) => {
                let detail = format!("Failed to connect to vLLM: {}", e.detail());
                tracing::error!(error = %detail, "Model load failed");
                attempt.settle(LoadState::NotLoaded, Some(detail.clone()));
                metrics::record_model_load("failure");
                Err(BackendError::Unavailable(detail))
            }
        }
    }
}

/// Leaves `Loading` on every exit path, including a dropped load future.
struct LoadAttempt<'a> {
    lifecycle: &'a ModelLifecycle,
    settled: bool,
}

impl LoadAttempt<'_> {
    fn settle(mut self, state: LoadState, error: Option<String>) {
        let mut inner = self.lifecycle.lock();
        inner.state = state;
        if error.is_some() || state == LoadState::Loaded {
            inner.last_error = error;
        }
        self.settled = true;
    }
}

impl Drop for LoadAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let mut inner = self.lifecycle.lock();
            inner.state = LoadState::NotLoaded;
            inner.last_error = Some("load attempt cancelled".to_string());
            tracing::warn!("Model load attempt cancelled before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockBackend;
    use tokio::sync::Notify;

    async fn wait_for_state(lifecycle: &ModelLifecycle, state: LoadState) {
        while lifecycle.state() != state {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn second_load_does_not_probe_again() {
        let backend = Arc::new(MockBackend::healthy());
        let lifecycle = ModelLifecycle::new(backend.clone());

        assert_eq!(lifecycle.load(None).await, Ok(LoadOutcome::Loaded));
        assert_eq!(lifecycle.load(None).await, Ok(LoadOutcome::AlreadyLoaded));
        assert_eq!(backend.probe_calls(), 1);
        assert!(lifecycle.health().model_loaded);
    }

    #[tokio::test]
    async fn failed_probe_returns_to_not_loaded() {
        let backend = Arc::new(MockBackend::unreachable("connection refused"));
        let lifecycle = ModelLifecycle::new(backend.clone());

        let err = lifecycle.load(None).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Unavailable("Failed to connect to vLLM: connection refused".into())
        );
        assert_eq!(lifecycle.state(), LoadState::NotLoaded);
        assert_eq!(
            lifecycle.last_error().as_deref(),
            Some("Failed to connect to vLLM: connection refused")
        );

        // The next attempt probes afresh and can succeed.
        backend.set_probe_result(Ok(()));
        assert_eq!(lifecycle.load(None).await, Ok(LoadOutcome::Loaded));
        assert_eq!(backend.probe_calls(), 2);
        assert!(lifecycle.last_error().is_none());
    }

    #[tokio::test]
    async fn concurrent_load_reports_in_progress() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(MockBackend::healthy().with_probe_gate(gate.clone()));
        let lifecycle = Arc::new(ModelLifecycle::new(backend.clone()));

        let first = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.load(None).await }
        });
        wait_for_state(&lifecycle, LoadState::Loading).await;

        assert_eq!(lifecycle.load(None).await, Ok(LoadOutcome::InProgress));
        assert!(!lifecycle.health().model_loaded);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), Ok(LoadOutcome::Loaded));
        assert_eq!(backend.probe_calls(), 1);
        assert!(lifecycle.health().model_loaded);
    }

    #[tokio::test]
    async fn dropped_load_does_not_stay_loading() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(MockBackend::healthy().with_probe_gate(gate));
        let lifecycle = Arc::new(ModelLifecycle::new(backend));

        let task = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.load(None).await }
        });
        wait_for_state(&lifecycle, LoadState::Loading).await;

        task.abort();
        let _ = task.await;

        assert_eq!(lifecycle.state(), LoadState::NotLoaded);
        assert_eq!(
            lifecycle.last_error().as_deref(),
            Some("load attempt cancelled")
        );
    }

    #[tokio::test]
    async fn probe_receives_request_id() {
        let backend = Arc::new(MockBackend::healthy());
        let lifecycle = ModelLifecycle::new(backend.clone());

        lifecycle.load(Some("req-load")).await.unwrap();
        assert_eq!(backend.last_request_id().as_deref(), Some("req-load"));
    }

    #[test]
    fn health_starts_not_loaded() {
        let lifecycle = ModelLifecycle::new(Arc::new(MockBackend::healthy()));
        let health = lifecycle.health();
        assert_eq!(health.status, "healthy");
        assert!(!health.model_loaded);
    }
}
