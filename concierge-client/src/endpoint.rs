//! Chat endpoint abstraction and its HTTP implementation

use async_trait::async_trait;
use concierge_core::utils::truncate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChatError;

/// Longest plain-text error body echoed back to the user
const MAX_PLAIN_DETAIL: usize = 200;

/// A service that turns one user message into one reply
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    async fn send(&self, message: &str) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    reply: String,
}

/// `POST {base_url}/chat` over reqwest
#[derive(Clone)]
pub struct HttpChatEndpoint {
    client: Client,
    base_url: String,
}

impl HttpChatEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    async fn send(&self, message: &str) -> Result<String, ChatError> {
        let url = self.chat_url();
        debug!("Sending chat request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| {
                warn!("Chat request to {} failed: {}", url, e);
                ChatError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!("Failed to read chat response body: {}", e);
            ChatError::Transport(e.to_string())
        })?;

        if !status.is_success() {
            warn!("Chat endpoint returned {}", status);
            return Err(ChatError::Server {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        match serde_json::from_str::<ChatReply>(&body) {
            Ok(parsed) => Ok(parsed.reply),
            Err(e) => {
                warn!("Chat endpoint sent an unreadable reply: {}", e);
                Err(ChatError::Server {
                    status: status.as_u16(),
                    detail: None,
                })
            }
        }
    }
}

/// Pull diagnostic text out of a failed response body.
///
/// Prefers `debug`, then `reply`, then a non-JSON body as plain text.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => ["debug", "reply"].into_iter().find_map(|field| {
            value
                .get(field)
                .and_then(serde_json::Value::as_str)
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
        }),
        Err(_) => Some(truncate(trimmed, MAX_PLAIN_DETAIL)),
    }
}
