//! Layered configuration: a YAML file plus `AGENT_BENCH_`-prefixed
//! environment overrides, read through the `config` crate the way
//! `src/cli/runtime.rs::load_config` reads `Config` from
//! `config/config.yaml`. CLI flags take final precedence over both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bench_types::{AgentId, ProjectId};
use serde::Deserialize;

use bench_orchestrator::{BenchmarkConfig, EvaluatorMode};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// A remote agent reached over the `/solve_task` + `/act` HTTP
    /// contract (spec.md §6).
    Http { base_url: String },
    /// The built-in random-clicker baseline; no network round trip.
    RandomClicker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    #[serde(flatten)]
    pub kind: AgentKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    /// Base URL of the target web application's backend, used both for
    /// `BackendService::reset`/`events_since` and, unless a task cache
    /// is already populated, for fetching that project's task set.
    pub backend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub projects: Vec<ProjectEntry>,
    pub agents: Vec<AgentEntry>,
    pub runs: u32,
    pub max_parallel_agent_calls: usize,
    pub use_cached_tasks: bool,
    pub use_cached_solutions: bool,
    pub record_gif: bool,
    pub save_results_json: bool,
    pub evaluator_mode: String,
    pub max_steps_per_task: usize,
    pub agent_call_timeout_secs: u64,
    pub chunk_size: usize,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub metrics_port: u16,
    pub log_level: String,
    pub headless: bool,
    pub judge_url: Option<String>,
    /// Synthesizes a `page_view` backend event on every URL change
    /// (SPEC_FULL §6). Disable for target apps whose own page-view
    /// events would otherwise be double-counted.
    pub monitor_navigation: bool,
}

impl Default for AppConfig {
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
            evaluator_mode: "concurrent".to_string(),
            max_steps_per_task: 20,
            agent_call_timeout_secs: 180,
            chunk_size: 4,
            cache_dir: PathBuf::from("data/cache"),
            output_dir: PathBuf::from("data/results"),
            metrics_port: 9090,
            log_level: "info".to_string(),
            headless: true,
            judge_url: None,
            monitor_navigation: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("unknown evaluator_mode '{0}', expected 'concurrent' or 'stateful'")]
    UnknownEvaluatorMode(String),
}

impl AppConfig {
    /// Priority: `./config/agent-bench.yaml` > `~/.config/agent-bench/config.yaml`,
    /// overridden by `AGENT_BENCH_*` environment variables, mirroring
    /// `src/cli/runtime.rs::load_config`'s own file-then-env precedence.
    pub fn load(explicit_path: Option<&Path>) -> Result<(Self, PathBuf), AppConfigError> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => {
                let local = PathBuf::from("config/agent-bench.yaml");
                if local.exists() {
                    local
                } else {
                    dirs::config_dir()
                        .map(|mut p| {
                            p.push("agent-bench");
                            p.push("config.yaml");
                            p
                        })
                        .unwrap_or(local)
                }
            }
        };

        let mut builder = config::Config::builder();
        if path.exists() {
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("AGENT_BENCH")
                .separator("__")
                .try_parsing(true),
        );
        let raw = builder.build()?;
        let config: AppConfig = raw.try_deserialize().unwrap_or_default();
        Ok((config, path))
    }

    pub fn evaluator_mode(&self) -> Result<EvaluatorMode, AppConfigError> {
        match self.evaluator_mode.as_str() {
            "concurrent" => Ok(EvaluatorMode::Concurrent),
            "stateful" => Ok(EvaluatorMode::Stateful),
            other => Err(AppConfigError::UnknownEvaluatorMode(other.to_string())),
        }
    }

    pub fn benchmark_config(&self) -> Result<BenchmarkConfig, AppConfigError> {
        Ok(BenchmarkConfig {
            projects: self.projects.iter().map(|p| ProjectId::from(p.id.as_str())).collect(),
            agents: self.agents.iter().map(|a| AgentId::from(a.id.as_str())).collect(),
            runs: self.runs,
            max_parallel_agent_calls: self.max_parallel_agent_calls,
            use_cached_tasks: self.use_cached_tasks,
            use_cached_solutions: self.use_cached_solutions,
            record_gif: self.record_gif,
            save_results_json: self.save_results_json,
            evaluator_mode: self.evaluator_mode()?,
            max_steps_per_task: self.max_steps_per_task,
            agent_call_timeout: Duration::from_secs(self.agent_call_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_as_concurrent_mode() {
        let config = AppConfig::default();
        assert!(matches!(config.evaluator_mode().unwrap(), EvaluatorMode::Concurrent));
        assert!(config.monitor_navigation);
        assert!(config.use_cached_tasks);
    }

    #[test]
    fn unknown_evaluator_mode_is_rejected() {
        let config = AppConfig {
            evaluator_mode: "parallel-universe".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.evaluator_mode(),
            Err(AppConfigError::UnknownEvaluatorMode(mode)) if mode == "parallel-universe"
        ));
    }

    #[test]
    fn benchmark_config_carries_project_and_agent_ids_through() {
        let config = AppConfig {
            projects: vec![ProjectEntry {
                id: "shop".to_string(),
                backend_url: "http://backend/".to_string(),
            }],
            agents: vec![AgentEntry {
                id: "agent-a".to_string(),
                kind: AgentKind::RandomClicker,
            }],
            ..AppConfig::default()
        };
        let benchmark_config = config.benchmark_config().unwrap();
        assert_eq!(benchmark_config.projects, vec![ProjectId::from("shop")]);
        assert_eq!(benchmark_config.agents, vec![AgentId::from("agent-a")]);
    }
}
