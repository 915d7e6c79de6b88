//! Mock backend implementation for testing.

use super::{BackendError, CompletionBackend};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

/// Scriptable backend that counts every call it receives.
pub struct MockBackend {
    probe_result: Mutex<Result<(), BackendError>>,
    completion: Mutex<Result<String, BackendError>>,
    probe_gate: Option<Arc<Notify>>,
    probe_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    last_request_id: Mutex<Option<String>>,
}

impl MockBackend {
    /// A reachable backend answering every prompt with `SELECT 1;`.
    pub fn healthy() -> Self {
        Self {
            probe_result: Mutex::new(Ok(())),
            completion: Mutex::new(Ok("SELECT 1;".to_string())),
            probe_gate: None,
            probe_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            last_request_id: Mutex::new(None),
        }
    }

    /// A backend whose probe and completions fail as unreachable.
    pub fn unreachable(detail: &str) -> Self {
        let backend = Self::healthy();
        backend.set_probe_result(Err(BackendError::Unavailable(detail.to_string())));
        backend.set_completion(Err(BackendError::Unavailable(detail.to_string())));
        backend
    }

    /// Text returned by `complete`.
    pub fn with_completion(self, text: &str) -> Self {
        self.set_completion(Ok(text.to_string()));
        self
    }

    /// Hold every probe until `gate` is notified.
    pub fn with_probe_gate(mut self, gate: Arc<Notify>) -> Self {
        self.probe_gate = Some(gate);
        self
    }

    pub fn set_probe_result(&self, result: Result<(), BackendError>) {
        *self
            .probe_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn set_completion(&self, result: Result<String, BackendError>) {
        *self
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Request ID passed with the most recent call.
    pub fn last_request_id(&self) -> Option<String> {
        self.last_request_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_request_id(&self, request_id: Option<&str>) {
        *self
            .last_request_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = request_id.map(str::to_string);
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn probe(&self, request_id: Option<&str>) -> Result<(), BackendError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.record_request_id(request_id);

        if let Some(gate) = &self.probe_gate {
            gate.notified().await;
        }

        self.probe_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn complete(
        &self,
        _prompt: &str,
        request_id: Option<&str>,
    ) -> Result<String, BackendError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.record_request_id(request_id);

        self.completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
