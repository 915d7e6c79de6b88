pub mod generator;
pub mod lifecycle;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod sanitizer;

pub use generator::{GenerateOutcome, GenerationError, SqlGenerator};
pub use lifecycle::{LoadOutcome, ModelLifecycle};
pub use prompt::{PromptBuilder, PromptError};
pub use providers::{BackendError, CompletionBackend};
pub use sanitizer::{SanitizeError, SqlSanitizer};
