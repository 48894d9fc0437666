//! News retrieval used to seed chat sessions

use crate::error::{ChatError, Result};
use crate::types::NewsDoc;
use async_trait::async_trait;
use desk_utils::DeskConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Source of grounding documents for a token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_docs(&self, token: &str) -> Result<Vec<NewsDoc>>;
}

#[derive(Debug, Serialize)]
struct NewsRequest<'a> {
    token: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsDoc>,
}

/// Client for `POST {api_base}/news`
#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    endpoint: String,
    top_k: usize,
}

impl NewsClient {
    /// # Arguments
    /// * `api_base` - Backend base URL
    /// * `top_k` - Documents requested and kept
    pub fn new(api_base: &str, top_k: usize) -> Self {
        Self::with_client(Client::new(), api_base, top_k)
    }

    /// Build from the shared desk configuration
    pub fn from_config(config: &DeskConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, config.api_base(), config.news_top_k))
    }

    fn with_client(client: Client, api_base: &str, top_k: usize) -> Self {
        Self {
            client,
            endpoint: format!("{}/news", api_base.trim_end_matches('/')),
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl NewsSource for NewsClient {
    async fn fetch_docs(&self, token: &str) -> Result<Vec<NewsDoc>> {
        let body = NewsRequest {
            token,
            top_k: self.top_k,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(ChatError::Api(format!(
                "News API responded with {}",
                response.status().as_u16()
            )));
        }

        let mut docs = response.json::<NewsResponse>().await?.results;
        docs.truncate(self.top_k);
        tracing::debug!(token, docs = docs.len(), "fetched news documents");
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = NewsClient::new("http://127.0.0.1:8000/", 0);
        assert_eq!(client.endpoint, "http://127.0.0.1:8000/news");
        assert_eq!(client.top_k(), 1);
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(NewsRequest { token: "SOL", top_k: 3 }).unwrap();
        assert_eq!(body, json!({"token": "SOL", "top_k": 3}));
    }

    #[test]
    fn test_response_without_results() {
        let parsed: NewsResponse = serde_json::from_value(json!({"token": "SOL"})).unwrap();
        assert!(parsed.results.is_empty());
    }
}
