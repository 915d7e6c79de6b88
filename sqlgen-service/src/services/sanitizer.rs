//! Cleanup of raw model output into an executable SQL statement.
//!
//! This is a textual heuristic, not a SQL parser: it does not check syntax,
//! balance quotes, or notice a `;` that sits inside a string literal.

use crate::models::GeneratedSql;
use thiserror::Error;

/// Code-fence markers the model wraps statements in.
///
/// Order matters: "```sql" must go before the bare fence.
const CODE_MARKERS: [&str; 4] = ["\\begin{code}", "\\end{code}", "```sql", "```"];

/// Default truncation delimiters, applied in order.
pub const DEFAULT_DELIMITERS: [&str; 2] = ["\n\n", "Comment:"];

const ELLIPSIS: &str = "...";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("generated SQL query is incomplete")]
    IncompleteGeneration,
}

/// Turns free-form completions into a terminated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSanitizer {
    delimiters: Vec<String>,
}

impl Default for SqlSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS.iter().map(|d| d.to_string()))
    }
}

impl SqlSanitizer {
    /// Build a sanitizer truncating at `delimiters` in the given order.
    /// Empty delimiters are ignored.
    pub fn new(delimiters: impl IntoIterator<Item = String>) -> Self {
        Self {
            delimiters: delimiters.into_iter().filter(|d| !d.is_empty()).collect(),
        }
    }

    pub fn delimiters(&self) -> &[String] {
        &self.delimiters
    }

    pub fn sanitize(&self, raw: &str) -> Result<GeneratedSql, SanitizeError> {
        let mut text = raw.trim().to_string();

        for marker in CODE_MARKERS {
            text = text.replace(marker, "");
        }

        let mut kept = text.as_str();
        for delimiter in &self.delimiters {
            kept = kept.split(delimiter.as_str()).next().unwrap_or_default();
        }
        let kept = kept.trim();

        if kept.is_empty() || kept.contains(ELLIPSIS) {
            return Err(SanitizeError::IncompleteGeneration);
        }

        let mut sql_formatted = kept.to_string();
        if !sql_formatted.ends_with(';') {
            sql_formatted.push(';');
        }

        let sql = sql_formatted.replace('\n', " ").replace("  ", " ");

        Ok(GeneratedSql { sql, sql_formatted })
    }
}
