//! Client for the SQL generation API and an in-memory chat session on top.
//!
//! The session follows the chat front end's flow: make sure the model is
//! loaded, then turn each user message into a SQL reply. History lives only
//! as long as the session value.

use crate::models::{
    GenerateSqlRequest, GenerateSqlResponse, GeneratedSql, HealthStatus, StatusResponse,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use service_core::observability::TracedRequestExt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot connect to the API: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Unexpected API response: {0}")]
    Decode(reqwest::Error),

    #[error("Model not loaded: {0}")]
    NotLoaded(String),
}

/// Typed client for the service's model endpoints.
pub struct SqlAssistantClient {
    client: Client,
    api_url: String,
}

impl SqlAssistantClient {
    /// `api_url` includes the API prefix, e.g. `http://localhost:8080/api/v1`.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.api_url))
            .with_trace_context(None)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn load_model(&self) -> Result<StatusResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/load-model", self.api_url))
            .with_trace_context(None)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Load the model unless health already reports it loaded.
    pub async fn ensure_model_loaded(&self) -> Result<(), ClientError> {
        if self.health().await?.model_loaded {
            return Ok(());
        }

        let status = self.load_model().await?;
        tracing::info!(status = %status.status, "Requested model load");
        Ok(())
    }

    pub async fn generate_sql(&self, query: &str) -> Result<GeneratedSql, ClientError> {
        let request = GenerateSqlRequest {
            query: query.to_string(),
            schema: None,
        };

        let response = self
            .client
            .post(format!("{}/generate-sql", self.api_url))
            .with_trace_context(None)
            .json(&request)
            .send()
            .await?;

        match Self::parse(response).await? {
            GenerateSqlResponse::Generated(sql) => Ok(sql),
            GenerateSqlResponse::Status(status) => Err(ClientError::NotLoaded(status.status)),
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        response.json().await.map_err(ClientError::Decode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Formatted SQL attached to a successful assistant reply.
    pub sql: Option<String>,
}

pub const SQL_REPLY: &str = "Here's the SQL query for your request:";
pub const FAILED_REPLY: &str = "Failed to generate SQL";
pub const CONNECTION_ERROR_REPLY: &str = "Connection error";

/// Conversation kept for the current session only.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send `prompt` and record both sides of the exchange.
    ///
    /// Failures become an assistant message as well as the returned error.
    pub async fn ask(
        &mut self,
        client: &SqlAssistantClient,
        prompt: &str,
    ) -> Result<ChatMessage, ClientError> {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: prompt.to_string(),
            sql: None,
        });

        let (reply, result) = match client.generate_sql(prompt).await {
            Ok(generated) => (
                ChatMessage {
                    role: Role::Assistant,
                    content: SQL_REPLY.to_string(),
                    sql: Some(generated.sql_formatted),
                },
                Ok(()),
            ),
            Err(e) => {
                let content = match &e {
                    ClientError::Connection(_) => CONNECTION_ERROR_REPLY,
                    _ => FAILED_REPLY,
                };
                (
                    ChatMessage {
                        role: Role::Assistant,
                        content: content.to_string(),
                        sql: None,
                    },
                    Err(e),
                )
            }
        };

        self.messages.push(reply.clone());
        result.map(|()| reply)
    }
}
