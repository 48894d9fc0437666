//! Wire types for the chat and news endpoints

use serde::{Deserialize, Serialize};

/// Sentiment score at or above which a document reads as bullish
pub const BULLISH_THRESHOLD: f64 = 0.15;
/// Sentiment score at or below which a document reads as bearish
pub const BEARISH_THRESHOLD: f64 = -0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the server-held transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= BULLISH_THRESHOLD => Self::Bullish,
            Some(s) if s <= BEARISH_THRESHOLD => Self::Bearish,
            _ => Self::Neutral,
        }
    }
}

/// News document used to ground a chat session
///
/// Fields the dashboard does not interpret are kept and sent back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text the backend grounds answers on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NewsDoc {
    pub fn sentiment_label(&self) -> SentimentLabel {
        SentimentLabel::from_score(self.sentiment_score)
    }
}

/// Body of a chat turn
///
/// Exactly one of `session_id` (continuation) or `docs` (bootstrap) is set
/// by [`crate::ChatSession`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub token: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<NewsDoc>>,
}

/// Backend reply to a chat turn
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    /// Full transcript, authoritative
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}
