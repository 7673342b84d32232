//! Orchestrator-level errors. Construction failures are fatal and meant to
//! surface all the way to the CLI's `main`; everything else the
//! orchestrator logs and swallows so neighboring work proceeds (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BenchmarkConfig.projects must not be empty")]
    NoProjects,
    #[error("BenchmarkConfig.agents must not be empty")]
    NoAgents,
    #[error("BenchmarkConfig.agents contains a duplicate id: {0}")]
    DuplicateAgentId(String),
    #[error("BenchmarkConfig.runs must be positive")]
    RunsNotPositive,
    #[error("BenchmarkConfig.max_parallel_agent_calls must be positive")]
    ConcurrencyNotPositive,
    #[error("BenchmarkConfig.max_steps_per_task must be positive")]
    MaxStepsNotPositive,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("loading tasks for project {project}: {source}")]
    TaskSource {
        project: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("no backend registered for project {0}")]
    UnknownProject(String),
    #[error("no agent registered for id {0}")]
    UnknownAgent(String),
}
