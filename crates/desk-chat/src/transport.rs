//! Chat endpoint transport

use crate::error::{ChatError, Result};
use crate::types::{ChatReply, ChatRequest};
use async_trait::async_trait;
use desk_utils::DeskConfig;
use reqwest::Client;

/// Delivers one chat turn to the backend
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<ChatReply>;
}

/// `POST {api_base}/chat/` over HTTP
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(api_base: &str) -> Self {
        Self::with_client(Client::new(), api_base)
    }

    /// Build from the shared desk configuration
    pub fn from_config(config: &DeskConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, config.api_base()))
    }

    fn with_client(client: Client, api_base: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/", api_base.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        tracing::debug!(
            endpoint = %self.endpoint,
            token = %request.token,
            continuation = request.session_id.is_some(),
            docs = request.docs.as_ref().map_or(0, Vec::len),
            "sending chat turn"
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(ChatError::Api(format!(
                "Chat API returned {}",
                response.status().as_u16()
            )));
        }

        Ok(response.json::<ChatReply>().await?)
    }
}
