//! Client for the remote chat endpoint
//!
//! Two calls make up the whole wire contract:
//! - `POST /api/chat/` with `{"message": ...}`, answered by `{"reply": ...}`
//!   or `{"error": ...}`
//! - `POST /api/reset-session/` with no body
//!
//! The service keeps the model-side chat history in its own session, so the
//! HTTP client carries a cookie store.

use crate::config::EndpointConfig;
use crate::{Result, VoicebotError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body of a chat call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body of a chat answer; exactly one field is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Collapse the answer into the reply text or an endpoint error
    pub fn into_reply(self) -> Result<String> {
        match (self.reply, self.error) {
            (_, Some(error)) => Err(VoicebotError::EndpointError(error)),
            (Some(reply), None) => Ok(reply),
            (None, None) => Err(VoicebotError::EndpointError(
                "response carried neither reply nor error".into(),
            )),
        }
    }
}

/// The remote chat service as seen by the controller
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Send one user message and wait for the bot reply
    async fn send_message(&self, text: &str) -> Result<String>;

    /// Drop the server-side conversation state
    async fn reset_session(&self) -> Result<()>;
}

/// `ChatEndpoint` over HTTP
pub struct HttpChatClient {
    http: Client,
    chat_url: String,
    reset_url: String,
}

impl HttpChatClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()
            .map_err(|e| VoicebotError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        info!("Chat endpoint: {}", config.chat_url());

        Ok(Self {
            http,
            chat_url: config.chat_url(),
            reset_url: config.reset_url(),
        })
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatClient {
    async fn send_message(&self, text: &str) -> Result<String> {
        debug!("POST {} ({} chars)", self.chat_url, text.chars().count());

        let response = self
            .http
            .post(&self.chat_url)
            .json(&ChatRequest {
                message: text.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error answers carry a JSON body too, so parse before checking status
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            VoicebotError::EndpointError(format!("unreadable response ({}): {}", status, e))
        })?;

        if !status.is_success() && parsed.error.is_none() {
            return Err(VoicebotError::EndpointError(format!(
                "server answered {}",
                status
            )));
        }

        parsed.into_reply()
    }

    async fn reset_session(&self) -> Result<()> {
        debug!("POST {}", self.reset_url);

        self.http
            .post(&self.reset_url)
            .send()
            .await?
            .error_for_status()?;

        info!("Server session reset");
        Ok(())
    }
}
