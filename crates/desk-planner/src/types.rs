//! Plan requests and runs

use crate::error::{PlanError, Result};
use crate::event::PlanStep;
use desk_core::Generation;
use desk_utils::DeskConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_STEPS: u32 = 4;
pub const DEFAULT_STOP_SCORE: f64 = 0.55;

/// Error shown for any failure of the stream itself
pub const STREAM_FAILED_MESSAGE: &str = "Planner stream failed.";

/// Parameters of one plan run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRequest {
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub max_steps: u32,
    pub stop_score: f64,
}

impl PlanRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            token: None,
            user_id: None,
            max_steps: DEFAULT_MAX_STEPS,
            stop_score: DEFAULT_STOP_SCORE,
        }
    }

    /// Take the user id and planner limits from `config`
    pub fn with_config(mut self, config: &DeskConfig) -> Self {
        self.user_id = Some(config.default_user_id.clone());
        self.max_steps = config.plan_max_steps;
        self.stop_score = config.plan_stop_score;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn stop_score(mut self, stop_score: f64) -> Self {
        self.stop_score = stop_score;
        self
    }

    /// Copy with the goal trimmed, or [`PlanError::EmptyGoal`]
    pub fn normalized(&self) -> Result<Self> {
        let goal = self.goal.trim();
        if goal.is_empty() {
            return Err(PlanError::EmptyGoal);
        }
        Ok(Self {
            goal: goal.to_string(),
            ..self.clone()
        })
    }

    /// Query string pairs for the SSE endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("goal", self.goal.clone())];
        if let Some(token) = &self.token {
            pairs.push(("token", token.clone()));
        }
        if let Some(user_id) = &self.user_id {
            pairs.push(("user_id", user_id.clone()));
        }
        pairs.push(("max_steps", self.max_steps.to_string()));
        pairs.push(("stop_score", self.stop_score.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The current run of a consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanRun {
    pub generation: Generation,
    pub goal: String,
    pub status: PlanStatus,
    pub steps: Vec<PlanStep>,
    pub final_answer: Option<String>,
    pub context: Option<Value>,
    pub error: Option<String>,
}

impl PlanRun {
    pub(crate) fn streaming(generation: Generation, goal: &str) -> Self {
        Self {
            generation,
            goal: goal.to_string(),
            status: PlanStatus::Streaming,
            ..Default::default()
        }
    }

    pub(crate) fn cancelled(generation: Generation, goal: &str) -> Self {
        Self {
            status: PlanStatus::Cancelled,
            ..Self::streaming(generation, goal)
        }
    }

    /// Whether the run is still waiting for events
    pub fn is_loading(&self) -> bool {
        self.status == PlanStatus::Streaming
    }
}

/// Result of a non-streaming plan call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanOutcome {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request = PlanRequest::new("Should I buy BTC?");
        assert_eq!(request.max_steps, 4);
        assert!((request.stop_score - 0.55).abs() < f64::EPSILON);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"goal": "Should I buy BTC?", "max_steps": 4, "stop_score": 0.55}));
    }

    #[test]
    fn test_request_from_config() {
        let config = DeskConfig::builder()
            .default_user_id("U42")
            .plan_max_steps(6)
            .plan_stop_score(0.7)
            .build()
            .unwrap();
        let request = PlanRequest::new("g").with_config(&config).token("ETH");
        assert_eq!(
            request.query_pairs(),
            vec![
                ("goal", "g".to_string()),
                ("token", "ETH".to_string()),
                ("user_id", "U42".to_string()),
                ("max_steps", "6".to_string()),
                ("stop_score", "0.7".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalized_goal() {
        assert!(matches!(PlanRequest::new("   ").normalized(), Err(PlanError::EmptyGoal)));
        assert_eq!(PlanRequest::new("  hedge?  ").normalized().unwrap().goal, "hedge?");
    }

    #[test]
    fn test_outcome_parsing() {
        let outcome: PlanOutcome = serde_json::from_value(json!({
            "type": "final",
            "goal": "g",
            "final_answer": "Hold",
            "context": {"analysis": null},
            "steps": [{"step": 1, "action": "fetch_price", "thought": "", "result": "ok"}]
        }))
        .unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.final_answer.as_deref(), Some("Hold"));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!PlanStatus::Idle.is_terminal());
        assert!(!PlanStatus::Streaming.is_terminal());
        assert!(PlanStatus::Cancelled.is_terminal());
    }
}
