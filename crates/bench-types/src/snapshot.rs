//! Per-step browser state capture and the results built on top of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::errors::StepError;

/// A single backend event observed since the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Immutable capture of browser state after one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// 0-based step index.
    pub iteration: usize,
    pub current_url: String,
    pub current_html: String,
    /// DOM text of the previous snapshot, or empty at step 0.
    pub prev_html: String,
    /// Backend events observed since the previous snapshot.
    pub backend_events: Vec<BackendEvent>,
    pub screenshot_before: Option<String>,
    pub screenshot_after: Option<String>,
    /// The action that produced this transition.
    pub action: Action,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of executing one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub browser_snapshot: Snapshot,
    pub successfully_executed: bool,
    pub execution_time_ms: u64,
    pub error: Option<StepError>,
}

/// Outcome of evaluating one predicate against one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TestResult {
    pub fn pass() -> Self {
        Self {
            success: true,
            extra: Default::default(),
        }
    }

    pub fn fail() -> Self {
        Self {
            success: false,
            extra: Default::default(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// `step_count x predicate_count` grid of [`TestResult`]s.
pub type TestResultsMatrix = Vec<Vec<TestResult>>;

/// Structured explanation of a score, built by the feedback aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub executed_actions: usize,
    pub failed_actions: usize,
    pub passed_predicates: usize,
    pub failed_predicates: usize,
    pub total_execution_time_ms: u64,
    /// `max(0, floor((total - expected) / 5) * 0.5)`, reported but not
    /// applied to `final_score` by default.
    pub time_penalty: f64,
    /// Set when the episode in stateful mode ended because
    /// `max_steps_per_task` was hit rather than the agent returning an
    /// empty action list.
    pub truncated: bool,
    pub explanation: String,
}

/// Per-phase timing breakdown recorded for every evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub browser_setup_ms: u64,
    pub action_execution_ms: u64,
    pub test_execution_ms: u64,
    pub random_baseline_ms: u64,
}

/// Final scored outcome of evaluating one solution against a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub task_id: crate::ids::TaskId,
    pub web_agent_id: crate::ids::AgentId,
    /// Clamped to `[0, 1]`.
    pub final_score: f64,
    pub raw_score: f64,
    pub random_baseline_score: f64,
    pub execution_history: Vec<ActionResult>,
    pub test_results_matrix: TestResultsMatrix,
    pub feedback: Feedback,
    pub phase_timings: PhaseTimings,
    pub gif_recording: Option<String>,
}

impl EvaluationResult {
    /// The synchronous empty result for a solution with no actions
    /// (invariant: `actions == [] => final_score == 0 && execution_history == []`).
    pub fn empty(task_id: crate::ids::TaskId, web_agent_id: crate::ids::AgentId) -> Self {
        Self {
            task_id,
            web_agent_id,
            final_score: 0.0,
            raw_score: 0.0,
            random_baseline_score: 0.0,
            execution_history: Vec::new(),
            test_results_matrix: Vec::new(),
            feedback: Feedback {
                executed_actions: 0,
                failed_actions: 0,
                passed_predicates: 0,
                failed_predicates: 0,
                total_execution_time_ms: 0,
                time_penalty: 0.0,
                truncated: false,
                explanation: "empty solution: no actions proposed".to_string(),
            },
            phase_timings: PhaseTimings::default(),
            gif_recording: None,
        }
    }
}
