//! HTTP transport for the chat backend.
//!
//! One `POST {base_url}/ai/chat` per submission — no retries, no queuing.
//! Every failure is normalized into [`ChatError`] so callers only ever see
//! a human-readable message, never a status code or a reqwest internal.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Shown in the transcript when the backend gives no usable failure detail.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unable to reach chat API.";

/// Reply payload from `POST /ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    /// Model deployment that produced the reply.
    pub deployment: String,
}

/// Request body. Wire names follow the backend's camelCase schema; unset
/// extras are omitted so the backend applies its own defaults.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Error body the backend may attach to a non-success response.
#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    detail: Option<String>,
}

/// Failures from a chat request.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Non-success response. `detail` is the backend's message when it sent one.
    #[error("chat API returned status {status}")]
    Api { status: u16, detail: Option<String> },

    /// The call itself failed: connect error, dead socket, unreadable body.
    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ChatError {
    /// Message safe to show in the transcript. Transport internals collapse
    /// to the fixed fallback string.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Boundary between the conversation controller and the network.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one prompt and await the backend's reply.
    async fn send(&self, prompt: &str) -> Result<ChatResponse, ChatError>;
}

/// Per-request extras sent alongside the prompt.
#[derive(Debug, Clone, Default)]
pub struct RequestDefaults {
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// HTTP implementation of [`ChatTransport`].
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    defaults: RequestDefaults,
}

impl ChatClient {
    /// Create a client for the given base endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_defaults(base_url, RequestDefaults::default())
    }

    /// Create a client with configured request extras.
    pub fn with_defaults(base_url: impl Into<String>, defaults: RequestDefaults) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            defaults,
        }
    }

    /// Create a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_defaults(
            config.api.base_url.clone(),
            RequestDefaults {
                system_prompt: config.chat.system_prompt.clone(),
                max_tokens: config.chat.max_tokens,
                temperature: config.chat.temperature,
            },
        )
    }

    /// The configured base endpoint (trailing slash stripped).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, prompt: &str) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/ai/chat", self.base_url);
        let body = ChatRequestBody {
            prompt,
            system_prompt: self.defaults.system_prompt.as_deref(),
            max_tokens: self.defaults.max_tokens,
            temperature: self.defaults.temperature,
        };

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Best effort: the backend sends `{"detail": "..."}` for handled
            // failures, but a proxy may answer with anything.
            let detail = response
                .json::<ChatErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .filter(|detail| !detail.is_empty());
            return Err(ChatError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json::<ChatResponse>().await?)
    }
}
