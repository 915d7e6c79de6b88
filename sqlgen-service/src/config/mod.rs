use crate::services::providers::vllm::VllmConfig;
use crate::services::sanitizer::DEFAULT_DELIMITERS;
use crate::services::{PromptBuilder, SqlSanitizer};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Request timeout towards vLLM when none is configured.
const DEFAULT_VLLM_TIMEOUT_SECS: u64 = 30;

const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert SQL assistant. Translate the user's \
request into a single SQL query. Answer with the SQL statement only.";

const DEFAULT_SQL_TEMPLATE: &str = "{system_prompt}\n\n### Question:\n{context}\n\n### SQL:\n";

#[derive(Debug, Clone, Deserialize)]
pub struct SqlgenConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub vllm: VllmSettings,
    pub api: ApiConfig,
    pub prompts: PromptConfig,
    pub sanitizer: SanitizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VllmSettings {
    /// Base URL of the vLLM server, e.g. `http://vllm:8000`.
    pub base_url: String,
    /// Model name sent with each completion request.
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Prefix for the model endpoints, e.g. `/api/v1`.
    pub prefix: String,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub system_prompt: String,
    /// Template with `{system_prompt}` and `{context}` placeholders.
    pub sql_template: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SanitizerConfig {
    /// Delimiters generated text is truncated at, applied in order.
    pub truncate_at: Vec<String>,
}

impl SqlgenConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let timeout_secs = get_env(
            "VLLM_TIMEOUT_SECS",
            Some(&DEFAULT_VLLM_TIMEOUT_SECS.to_string()),
            is_prod,
        )?;
        let timeout_secs = timeout_secs.parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(
                "VLLM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                timeout_secs
            ))
        })?;

        let config = SqlgenConfig {
            common: common_config,
            vllm: VllmSettings {
                base_url: get_env("VLLM_SERVER", Some("http://localhost:8000"), is_prod)?,
                model: get_env("VLLM_MODEL", Some("/model"), is_prod)?,
                timeout_secs,
            },
            api: ApiConfig {
                prefix: normalize_prefix(&get_env("API_V1_PREFIX", Some("/api/v1"), is_prod)?),
                allowed_origins: get_env("CORS_ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            },
            prompts: PromptConfig {
                system_prompt: get_env("SYSTEM_PROMPT", Some(DEFAULT_SYSTEM_PROMPT), is_prod)?,
                sql_template: get_env("SQL_TEMPLATE", Some(DEFAULT_SQL_TEMPLATE), is_prod)?,
            },
            sanitizer: SanitizerConfig {
                truncate_at: parse_delimiters(&get_env(
                    "SQL_TRUNCATE_AT",
                    Some(&DEFAULT_DELIMITERS.join("|").replace('\n', "\\n")),
                    is_prod,
                )?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail once traffic arrives.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api.prefix.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "API_V1_PREFIX must not be empty"
            )));
        }
        self.prompt_builder()?;
        Ok(())
    }

    pub fn vllm_config(&self) -> VllmConfig {
        VllmConfig {
            base_url: self.vllm.base_url.clone(),
            model: self.vllm.model.clone(),
            timeout: Duration::from_secs(self.vllm.timeout_secs),
        }
    }

    pub fn prompt_builder(&self) -> Result<PromptBuilder, AppError> {
        PromptBuilder::new(
            self.prompts.system_prompt.clone(),
            &self.prompts.sql_template,
        )
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))
    }

    pub fn sanitizer(&self) -> SqlSanitizer {
        SqlSanitizer::new(self.sanitizer.truncate_at.iter().cloned())
    }
}

/// `api/v1/` -> `/api/v1`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Split a `|`-separated delimiter list, expanding `\n` and `\t` escapes.
fn parse_delimiters(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(|d| d.replace("\\n", "\n").replace("\\t", "\t"))
        .filter(|d| !d.is_empty())
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SqlgenConfig {
        SqlgenConfig {
            common: core_config::Config::default(),
            vllm: VllmSettings {
                base_url: "http://localhost:8000".into(),
                model: "/model".into(),
                timeout_secs: 30,
            },
            api: ApiConfig {
                prefix: "/api/v1".into(),
                allowed_origins: vec!["*".into()],
            },
            prompts: PromptConfig {
                system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
                sql_template: DEFAULT_SQL_TEMPLATE.into(),
            },
            sanitizer: SanitizerConfig {
                truncate_at: DEFAULT_DELIMITERS.iter().map(|d| d.to_string()).collect(),
            },
        }
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[test]
    fn delimiters_expand_escapes() {
        assert_eq!(
            parse_delimiters("\\n\\n|Comment:||###"),
            vec!["\n\n".to_string(), "Comment:".to_string(), "###".to_string()]
        );
    }

    #[test]
    fn default_delimiters_round_trip_through_env_format() {
        let encoded = DEFAULT_DELIMITERS.join("|").replace('\n', "\\n");
        assert_eq!(parse_delimiters(&encoded), DEFAULT_DELIMITERS);
    }

    #[test]
    fn default_settings_validate() {
        assert!(config().validate().is_ok());
        assert_eq!(config().vllm_config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_template_is_a_config_error() {
        let mut config = config();
        config.prompts.sql_template = "{context} without system prompt".into();
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let mut config = config();
        config.api.prefix = String::new();
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }
}
