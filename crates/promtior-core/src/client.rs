use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::SendError;

/// Path of the LangServe invoke route, joined to the configured base URL.
pub const INVOKE_PATH: &str = "/promtior-rag/invoke";

/// Longest server error body kept in a [`SendError::Server`].
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Serialize)]
struct InvokeRequest<'a> {
    input: &'a str,
}

/// Something that can answer a user message with a raw JSON reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn invoke(&self, input: &str) -> Result<Value, SendError>;
}

#[derive(Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn invoke_url(&self) -> String {
        format!("{}{}", self.base_url, INVOKE_PATH)
    }
}

#[async_trait]
impl ChatBackend for RagClient {
    async fn invoke(&self, input: &str) -> Result<Value, SendError> {
        let url = self.invoke_url();
        info!(%url, "Outgoing request: POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&InvokeRequest { input })
            .send()
            .await?;

        let status = response.status();
        info!(status = status.as_u16(), %url, "Response status");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "RAG endpoint returned an error");
            return Err(SendError::Server {
                status: status.as_u16(),
                body: snippet(&body, ERROR_BODY_LIMIT),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Reply body received");
        Ok(serde_json::from_str(&body)?)
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
