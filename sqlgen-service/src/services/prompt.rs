//! Prompt assembly for SQL generation.
//!
//! Templates use `{system_prompt}` and `{context}` placeholders; `{{` and `}}`
//! render literal braces. The template is parsed once, so a malformed one is
//! rejected at startup rather than on the first request.

use thiserror::Error;

const SCHEMA_SEPARATOR: &str = "\nDatabase schema:\n";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Malformed prompt template: {0}")]
    MalformedTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    SystemPrompt,
    Context,
}

/// Combines the system prompt, an optional schema and the user question.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    segments: Vec<Segment>,
}

impl PromptBuilder {
    pub fn new(
        system_prompt: impl Into<String>,
        template: &str,
    ) -> Result<Self, PromptError> {
        let segments = parse_template(template)?;

        for (required, name) in [
            (Segment::SystemPrompt, "{system_prompt}"),
            (Segment::Context, "{context}"),
        ] {
            if !segments.contains(&required) {
                return Err(PromptError::MalformedTemplate(format!(
                    "missing {} placeholder",
                    name
                )));
            }
        }

        Ok(Self {
            system_prompt: system_prompt.into(),
            segments,
        })
    }

    pub fn build(&self, context: &str, schema: Option<&str>) -> String {
        let mut system_prompt = self.system_prompt.clone();
        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            tracing::debug!(schema_len = schema.len(), "Using schema in prompt");
            system_prompt.push_str(SCHEMA_SEPARATOR);
            system_prompt.push_str(schema);
        }

        let mut prompt = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::SystemPrompt => prompt.push_str(&system_prompt),
                Segment::Context => prompt.push_str(context),
            }
        }
        prompt
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, PromptError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(PromptError::MalformedTemplate(
                        "unclosed '{' in template".to_string(),
                    ));
                }

                let segment = match name.as_str() {
                    "system_prompt" => Segment::SystemPrompt,
                    "context" => Segment::Context,
                    other => {
                        return Err(PromptError::MalformedTemplate(format!(
                            "unknown placeholder {{{}}}",
                            other
                        )))
                    }
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
            }
            '}' => {
                return Err(PromptError::MalformedTemplate(
                    "single '}' encountered in template".to_string(),
                ))
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
