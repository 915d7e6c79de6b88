//! HTTP handlers for sqlgen-service.

pub mod health;
pub mod model;
pub mod sql;

pub use health::{health_check, metrics_endpoint, model_health, readiness_check};
pub use model::load_model;
pub use sql::generate_sql;
