//! Completion backends that write the concierge's replies

use async_trait::async_trait;
use concierge_core::config::ServerConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Error type for completion calls
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type CompletionResult<T> = Result<T, CompletionError>;

/// Produces one reply for one user message under a system prompt
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> CompletionResult<String>;
}

#[derive(Debug, Serialize)]
struct PromptMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<PromptMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiCompletion {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiCompletion {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.api_base.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.max_tokens,
        )
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletion {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> CompletionResult<String> {
        if self.api_key.trim().is_empty() {
            return Err(CompletionError::ConfigError(
                "no API key configured (set OPENAI_API_KEY)".to_string(),
            ));
        }

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                PromptMessage {
                    role: "system",
                    content: system_prompt,
                },
                PromptMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.max_tokens,
        };

        debug!(
            "Sending chat request to {} with model {}",
            self.api_base, self.model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_sends_system_and_user_messages() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "You are a helpful chatbot."},
                    {"role": "user", "content": "Take me to Ancient Rome"}
                ],
                "max_tokens": 150
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  You arrive in 44 BC.\n"}}]}"#)
            .create_async()
            .await;

        let backend = OpenAiCompletion::new(server.url(), "sk-test", "gpt-3.5-turbo", 150);
        let reply = backend
            .complete("You are a helpful chatbot.", "Take me to Ancient Rome")
            .await
            .unwrap();

        assert_eq!(reply, "You arrive in 44 BC.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let backend = OpenAiCompletion::new(server.url(), "sk-test", "gpt-3.5-turbo", 150);
        let err = backend.complete("system", "user").await.unwrap_err();

        assert!(matches!(err, CompletionError::ApiError(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let backend = OpenAiCompletion::new(server.url(), "sk-test", "gpt-3.5-turbo", 150);
        let err = backend.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_requires_api_key() {
        let backend = OpenAiCompletion::new("http://127.0.0.1:1", "", "gpt-3.5-turbo", 150);
        let err = backend.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, CompletionError::ConfigError(_)));
    }
}
