//! Incremental rollups (spec.md §4.5, §9 "must be computable incrementally
//! to avoid an O(runs · agents) memory spike"). `RollupAccumulator` folds
//! one `EvaluationResult` in at a time instead of buffering the full
//! per-run result set, and reports through a `bench_observe::ProgressSink`
//! as it goes — the same incremental-fold shape as
//! `scheduler::metrics`'s atomic counters, generalized to per-agent keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use bench_observe::ProgressSink;
use bench_types::{AgentId, EvaluationResult, ProjectId, TaskId};
use serde::Serialize;

/// One cell of the per-run rollup: `{agent -> {task -> TaskOutcome}}`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub prompt: String,
    pub score: f64,
    pub use_case: Option<String>,
}

pub type RunRollup = BTreeMap<AgentId, BTreeMap<TaskId, TaskOutcome>>;

/// Global per-agent tallies across all runs of a project (spec.md §4.5).
/// Success is `raw_score == 1.0` (the agent satisfied every applicable
/// predicate), not `final_score == 1.0`: `final_score` is baseline-adjusted
/// (`max(0, raw - baseline)`, spec.md §4.3 step 4 / §8 scenario S7) and is
/// generally < 1.0 whenever the random-clicker baseline for a task is
/// nonzero, even for an agent that completed the task outright. Gating
/// "success" on `final_score` would silently zero out the success count
/// for every task with a nonzero baseline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStats {
    pub success_count: u64,
    pub total: u64,
    pub time_sum_ms: u64,
    pub time_count: u64,
}

impl AgentStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total as f64
        }
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.time_count == 0 {
            0.0
        } else {
            self.time_sum_ms as f64 / self.time_count as f64
        }
    }

    fn fold(&mut self, success: bool, time_ms: u64) {
        self.total += 1;
        if success {
            self.success_count += 1;
        }
        self.time_sum_ms += time_ms;
        self.time_count += 1;
    }
}

/// Folds evaluation results into a per-exact-agent-id view and a
/// per-agent-family view (split on the first `-`), the latter grounded on
/// the original `display_batch_evaluation_summary`'s `agent_groups`.
pub struct RollupAccumulator {
    project: ProjectId,
    sink: Arc<dyn ProgressSink>,
    per_agent: BTreeMap<AgentId, AgentStats>,
    per_family: BTreeMap<String, AgentStats>,
}

impl RollupAccumulator {
    pub fn new(project: ProjectId, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            project,
            sink,
            per_agent: BTreeMap::new(),
            per_family: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, result: &EvaluationResult) {
        let success = result.raw_score == 1.0;
        let total_time_ms: u64 = result
            .execution_history
            .iter()
            .map(|step| step.execution_time_ms)
            .sum();

        self.per_agent
            .entry(result.web_agent_id.clone())
            .or_default()
            .fold(success, total_time_ms);
        self.per_family
            .entry(agent_family(result.web_agent_id.as_str()))
            .or_default()
            .fold(success, total_time_ms);

        let stats = &self.per_agent[&result.web_agent_id];
        self.sink.record_rollup(
            self.project.as_str(),
            result.web_agent_id.as_str(),
            stats.success_count,
            stats.total,
        );
    }

    pub fn per_agent(&self) -> &BTreeMap<AgentId, AgentStats> {
        &self.per_agent
    }

    pub fn per_family(&self) -> &BTreeMap<String, AgentStats> {
        &self.per_family
    }
}

fn agent_family(agent_id: &str) -> String {
    agent_id.split('-').next().unwrap_or(agent_id).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_observe::NullSink;
    use bench_types::{Feedback, PhaseTimings};

    fn result(agent_id: &str, final_score: f64, time_ms: u64) -> EvaluationResult {
        let mut r = EvaluationResult::empty(TaskId::new(), AgentId::from(agent_id));
        r.final_score = final_score;
        // Tests exercise a zero-baseline task, where raw_score == final_score.
        r.raw_score = final_score;
        r.execution_history = vec![bench_types::ActionResult {
            browser_snapshot: bench_types::Snapshot {
                iteration: 0,
                current_url: "http://x/".into(),
                current_html: String::new(),
                prev_html: String::new(),
                backend_events: vec![],
                screenshot_before: None,
                screenshot_after: None,
                action: bench_types::Action::Navigate { url: "http://x/".into() },
                timestamp: chrono::Utc::now(),
            },
            successfully_executed: true,
            execution_time_ms: time_ms,
            error: None,
        }];
        r.feedback = Feedback {
            executed_actions: 1,
            failed_actions: 0,
            passed_predicates: 1,
            failed_predicates: 0,
            total_execution_time_ms: time_ms,
            time_penalty: 0.0,
            truncated: false,
            explanation: String::new(),
        };
        r.phase_timings = PhaseTimings::default();
        r
    }

    #[test]
    fn folds_success_rate_and_average_time_per_agent() {
        let mut acc = RollupAccumulator::new(ProjectId::from("p1"), Arc::new(NullSink));
        acc.record(&result("agent-a", 1.0, 100));
        acc.record(&result("agent-a", 0.0, 300));
        let stats = &acc.per_agent()[&AgentId::from("agent-a")];
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.success_rate(), 0.5);
        assert_eq!(stats.average_time_ms(), 200.0);
    }

    #[test]
    fn success_is_gated_on_raw_score_not_baseline_adjusted_final_score() {
        let mut acc = RollupAccumulator::new(ProjectId::from("p1"), Arc::new(NullSink));
        let mut perfect_but_baseline_adjusted = result("agent-a", 1.0, 100);
        perfect_but_baseline_adjusted.raw_score = 1.0;
        perfect_but_baseline_adjusted.final_score = 0.67;
        acc.record(&perfect_but_baseline_adjusted);
        let stats = &acc.per_agent()[&AgentId::from("agent-a")];
        assert_eq!(stats.total, 1);
        assert_eq!(stats.success_count, 1, "raw_score==1.0 must count as a success even when a nonzero baseline drags final_score below 1.0");
    }

    #[test]
    fn groups_by_family_prefix_before_dash() {
        let mut acc = RollupAccumulator::new(ProjectId::from("p1"), Arc::new(NullSink));
        acc.record(&result("gpt4-v1", 1.0, 100));
        acc.record(&result("gpt4-v2", 1.0, 100));
        acc.record(&result("claude-v1", 0.0, 100));
        let family = acc.per_family();
        assert_eq!(family["gpt4"].total, 2);
        assert_eq!(family["claude"].total, 1);
    }
}
