//! Domain models for the SQL generation service.

pub mod sql;
pub mod status;

pub use sql::{GenerateSqlRequest, GenerateSqlResponse, GeneratedSql};
pub use status::{HealthStatus, LoadState, StatusResponse};
