use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::StatusResponse;

/// Body of `POST /generate-sql`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GenerateSqlRequest {
    #[validate(custom(function = "not_blank"))]
    pub query: String,
    /// Optional database schema appended to the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("query must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// A sanitized statement in its two renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSql {
    /// Single-line version suitable for execution.
    pub sql: String,
    /// Multi-line version suitable for display.
    pub sql_formatted: String,
}

/// Successful reply of `POST /generate-sql`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateSqlResponse {
    Generated(GeneratedSql),
    Status(StatusResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> GenerateSqlRequest {
        GenerateSqlRequest {
            query: query.to_string(),
            schema: None,
        }
    }

    #[test]
    fn blank_queries_are_invalid() {
        for query in ["", "   ", "\n\t "] {
            let errors = request(query).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("query"), "{:?}", query);
        }
    }

    #[test]
    fn padded_query_is_valid() {
        assert!(request("  count users ").validate().is_ok());
    }
}
