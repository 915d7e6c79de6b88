//! Terminal chat front end for the SQL generation API.
//!
//! Reads one question per line from stdin and prints the generated SQL.
//! Requires `API_URL` (e.g. `http://localhost:8080/api/v1`).

use dotenvy::dotenv;
use sqlgen_service::client::{ChatSession, ClientError, SqlAssistantClient};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let api_url = std::env::var("API_URL")
        .map_err(|_| anyhow::anyhow!("API_URL environment variable is not set"))?;

    let client = SqlAssistantClient::new(&api_url, REQUEST_TIMEOUT)?;
    client.ensure_model_loaded().await.map_err(|e| {
        tracing::error!("Failed to prepare the model: {}", e);
        anyhow::anyhow!("Can't connect to the API at {}: {}", client.api_url(), e)
    })?;

    let mut session = ChatSession::new();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"AI SQL Assistant. Ask anything about your data (Ctrl-D to quit).\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let output = match session.ask(&client, prompt).await {
            Ok(reply) => format!(
                "{}\n\n{}\n\n> ",
                reply.content,
                reply.sql.unwrap_or_default()
            ),
            Err(ClientError::NotLoaded(status)) => format!("{}\n\n> ", status),
            Err(e) => {
                let last = session
                    .messages()
                    .last()
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                format!("{}: {}\n\n> ", last, e)
            }
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    stdout.write_all(b"\n").await?;
    Ok(())
}
