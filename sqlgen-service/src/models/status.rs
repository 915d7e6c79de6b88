use serde::{Deserialize, Serialize};
use std::fmt;

/// Availability of the model behind the inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::NotLoaded => write!(f, "not_loaded"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Loaded => write!(f, "loaded"),
        }
    }
}

/// Snapshot returned by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn from_state(state: LoadState) -> Self {
        Self {
            status: "healthy".to_string(),
            model_loaded: state == LoadState::Loaded,
        }
    }
}

/// Plain `{ "status": ... }` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}
