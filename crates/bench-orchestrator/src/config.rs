//! `BenchmarkConfig` (spec.md §4.5): the orchestrator's top-level input,
//! grounded on `scheduler::model::SchedulerConfig`'s shape of plain,
//! validated-at-construction fields rather than a builder.

use std::collections::BTreeSet;
use std::time::Duration;

use bench_types::{AgentId, ProjectId};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorMode {
    Concurrent,
    Stateful,
}

impl Default for EvaluatorMode {
    fn default() -> Self {
        EvaluatorMode::Concurrent
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub projects: Vec<ProjectId>,
    pub agents: Vec<AgentId>,
    pub runs: u32,
    pub max_parallel_agent_calls: usize,
    pub use_cached_tasks: bool,
    pub use_cached_solutions: bool,
    pub record_gif: bool,
    pub save_results_json: bool,
    pub evaluator_mode: EvaluatorMode,
    pub max_steps_per_task: usize,
    /// Not named by spec.md's option table, but needed to bound the
    /// agent-client transport call itself rather than leave it unbounded;
    /// matches `scheduler::model::CallOptions`'s per-call timeout.
    pub agent_call_timeout: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            agents: Vec::new(),
            runs: 1,
            max_parallel_agent_calls: 4,
            use_cached_tasks: true,
            use_cached_solutions: true,
            record_gif: false,
            save_results_json: true,
            evaluator_mode: EvaluatorMode::Concurrent,
            max_steps_per_task: 20,
            agent_call_timeout: Duration::from_secs(180),
        }
    }
}

impl BenchmarkConfig {
    /// Validates the invariants spec.md §4.5 calls out explicitly:
    /// non-empty projects and agents, positive runs, positive
    /// concurrency, unique agent ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        if self.runs == 0 {
            return Err(ConfigError::RunsNotPositive);
        }
        if self.max_parallel_agent_calls == 0 {
            return Err(ConfigError::ConcurrencyNotPositive);
        }
        if self.max_steps_per_task == 0 {
            return Err(ConfigError::MaxStepsNotPositive);
        }
        let mut seen = BTreeSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.as_str()) {
                return Err(ConfigError::DuplicateAgentId(agent.as_str().to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BenchmarkConfig {
        BenchmarkConfig {
            projects: vec![ProjectId::from("p1")],
            agents: vec![AgentId::from("a1"), AgentId::from("a2")],
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_well_formed_config() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_empty_projects() {
        let mut cfg = base();
        cfg.projects.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoProjects)));
    }

    #[test]
    fn rejects_empty_agents() {
        let mut cfg = base();
        cfg.agents.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoAgents)));
    }

    #[test]
    fn rejects_duplicate_agent_ids() {
        let mut cfg = base();
        cfg.agents = vec![AgentId::from("a1"), AgentId::from("a1")];
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateAgentId(_))));
    }

    #[test]
    fn rejects_zero_runs_and_zero_concurrency() {
        let mut cfg = base();
        cfg.runs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::RunsNotPositive)));

        let mut cfg = base();
        cfg.max_parallel_agent_calls = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ConcurrencyNotPositive)));
    }
}
