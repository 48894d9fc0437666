//! Planner stream protocol
//!
//! Every message of a plan stream is one JSON object discriminated by its
//! `type` field:
//!
//! ```text
//! {"type":"status","message":"Planner started."}
//! {"type":"step","data":{"step":1,"action":"fetch_price","thought":"...","result":"...","score":0.8,"candidate_tools":[...]}}
//! {"type":"final","goal":"...","final_answer":"Hold","context":{...}}
//! {"type":"error","message":"..."}
//! ```
//!
//! The SSE endpoint additionally sends a bare `Planner started` line before
//! the first event.

use crate::error::{PlanError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Plain-text greeting sent by the SSE endpoint
pub const HANDSHAKE: &str = "Planner started";

/// Whether `message` is the plain-text handshake, with or without a period
pub fn is_handshake(message: &str) -> bool {
    let message = message.trim();
    message.strip_suffix('.').unwrap_or(message) == HANDSHAKE
}

/// Tool the planner considered for a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTool {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f64,
}

/// One step of a plan run
///
/// `index` is the server's `step` number, 0 until the consumer assigns the
/// arrival position to steps that came without one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(rename = "step", default)]
    pub index: u32,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thought: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub candidate_tools: Vec<CandidateTool>,
}

/// Message of a plan stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlanEvent {
    Status {
        #[serde(default)]
        message: Option<String>,
    },
    Step {
        data: PlanStep,
    },
    Final {
        #[serde(default)]
        goal: Option<String>,
        #[serde(default)]
        final_answer: Option<String>,
        #[serde(default)]
        context: Option<Value>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any other discriminant; skipped by consumers
    #[serde(other)]
    Unknown,
}

impl PlanEvent {
    /// Parse one message payload
    pub fn parse(message: &str) -> Result<Self> {
        serde_json::from_str(message).map_err(|e| PlanError::Malformed(format!("{e}: {}", preview(message))))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }
}

fn preview(message: &str) -> String {
    const MAX: usize = 80;
    match message.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}

/// Accepts a string, null, or any other JSON value rendered as text
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Accepts a number or a numeric string; anything else scores 0
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}
