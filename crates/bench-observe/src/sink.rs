//! The `ProgressSink` seam (spec §9 "Observability"): every action and
//! every evaluation records a timing; rollups must be computable
//! incrementally so nothing requires holding the full per-run history in
//! memory. This trait is the incremental-fold boundary the orchestrator's
//! `RollupAccumulator` reports through.

/// Sunk once per executed browser action.
pub struct ActionObservation<'a> {
    pub project: &'a str,
    pub action_kind: &'a str,
    pub success: bool,
    pub latency_ms: u64,
}

/// Sunk once per completed `(task, agent)` evaluation.
pub struct EvaluationObservation<'a> {
    pub project: &'a str,
    pub agent_id: &'a str,
    pub final_score: f64,
    pub total_ms: u64,
}

pub trait ProgressSink: Send + Sync {
    fn record_action(&self, observation: ActionObservation<'_>);
    fn record_evaluation(&self, observation: EvaluationObservation<'_>);
    /// Gauge-style update of the running success rate for one agent within
    /// one project, called as the orchestrator's rollup folds in.
    fn record_rollup(&self, project: &str, agent_id: &str, success_count: u64, total: u64);
}

/// A sink that discards every observation. Used in tests and wherever no
/// metrics backend is configured.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn record_action(&self, _observation: ActionObservation<'_>) {}
    fn record_evaluation(&self, _observation: EvaluationObservation<'_>) {}
    fn record_rollup(&self, _project: &str, _agent_id: &str, _success_count: u64, _total: u64) {}
}
