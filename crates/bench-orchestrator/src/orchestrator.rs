//! The Orchestrator (C11): drives `projects x runs x tasks x agents`
//! under a bounded worker pool, grounded on `scheduler::orchestrator`'s
//! shape (a struct holding its collaborators behind `Arc`, a bounded
//! dispatch path, metrics recorded at each step) generalized from "one
//! tool call" to "one (task, agent) attempt", plus `scheduler::lane`'s
//! idea of weighting concurrent work — realized here as the two
//! independent semaphores spec.md §5 calls for (`max_parallel_agent_calls`
//! and the evaluator's own `chunk_size`) rather than a priority lane,
//! since the orchestrator has no priority concept to schedule by.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bench_agent::Agent;
use bench_backend::BackendService;
use bench_cache::{SolutionCache, SolutionRecord};
use bench_evaluator::Evaluator;
use bench_observe::{EvaluationObservation, ProgressSink};
use bench_types::{AgentId, ProjectId, Task, TaskSolution};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::{BenchmarkConfig, EvaluatorMode};
use crate::errors::OrchestratorError;
use crate::project::{ProjectBackends, TaskSource};
use crate::rollup::{RollupAccumulator, RunRollup, TaskOutcome};
use crate::stateful::run_stateful_episode;

/// Outcome of driving one project through every configured run.
pub struct ProjectReport {
    pub project_id: ProjectId,
    /// `false` when the project failed before a single run completed;
    /// spec.md §4.5: "a project that fails completely is recorded with
    /// `successful_projects` unchanged".
    pub succeeded: bool,
    pub run_rollups: Vec<RunRollup>,
    pub global: BTreeMap<AgentId, crate::rollup::AgentStats>,
    pub global_by_family: BTreeMap<String, crate::rollup::AgentStats>,
}

pub struct Orchestrator {
    config: BenchmarkConfig,
    agents: BTreeMap<AgentId, Arc<dyn Agent>>,
    task_source: Arc<dyn TaskSource>,
    project_backends: Arc<dyn ProjectBackends>,
    evaluator: Arc<Evaluator>,
    solution_cache: Arc<SolutionCache>,
    progress_sink: Arc<dyn ProgressSink>,
    agent_call_semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        config: BenchmarkConfig,
        agents: BTreeMap<AgentId, Arc<dyn Agent>>,
        task_source: Arc<dyn TaskSource>,
        project_backends: Arc<dyn ProjectBackends>,
        evaluator: Arc<Evaluator>,
        solution_cache: Arc<SolutionCache>,
        progress_sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let agent_call_semaphore = Arc::new(Semaphore::new(config.max_parallel_agent_calls.max(1)));
        Self {
            config,
            agents,
            task_source,
            project_backends,
            evaluator,
            solution_cache,
            progress_sink,
            agent_call_semaphore,
        }
    }

    /// Runs every configured project in turn. A project that fails
    /// completely (its task source errors) is logged and skipped; the
    /// orchestrator proceeds to the next one (spec.md §4.5).
    pub async fn run(&self) -> Vec<ProjectReport> {
        let mut reports = Vec::with_capacity(self.config.projects.len());
        for project_id in &self.config.projects {
            match self.run_project(project_id).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(project = %project_id, "project failed completely: {}", err);
                    reports.push(ProjectReport {
                        project_id: project_id.clone(),
                        succeeded: false,
                        run_rollups: Vec::new(),
                        global: BTreeMap::new(),
                        global_by_family: BTreeMap::new(),
                    });
                }
            }
        }
        reports
    }

    async fn run_project(&self, project_id: &ProjectId) -> Result<ProjectReport, OrchestratorError> {
        let tasks = self
            .task_source
            .load_tasks(project_id, self.config.use_cached_tasks)
            .await?;
        let backend = self
            .project_backends
            .backend_for(project_id)
            .ok_or_else(|| OrchestratorError::UnknownProject(project_id.as_str().to_string()))?;

        let mut global = RollupAccumulator::new(project_id.clone(), self.progress_sink.clone());
        let mut run_rollups = Vec::with_capacity(self.config.runs as usize);
        for run_index in 0..self.config.runs {
            let rollup = self
                .run_once(project_id, &tasks, backend.clone(), &mut global)
                .await;
            info!(project = %project_id, run_index, agents = rollup.len(), "run complete");
            run_rollups.push(rollup);
        }

        Ok(ProjectReport {
            project_id: project_id.clone(),
            succeeded: true,
            run_rollups,
            global: global.per_agent().clone(),
            global_by_family: global.per_family().clone(),
        })
    }

    /// One full pass over every task for every agent. Failures within a
    /// single `(task, agent)` attempt never abort the run; a run only
    /// fails catastrophically if a panic unwinds out of it, which this
    /// function structurally cannot do since every collaborator call is
    /// already `Result`/default-on-error.
    async fn run_once(
        &self,
        project_id: &ProjectId,
        tasks: &[Task],
        backend: Arc<dyn BackendService>,
        global: &mut RollupAccumulator,
    ) -> RunRollup {
        let mut rollup: RunRollup = BTreeMap::new();
        for task in tasks {
            let results = match self.config.evaluator_mode {
                EvaluatorMode::Concurrent => self.run_task_concurrent(task, backend.clone()).await,
                EvaluatorMode::Stateful => self.run_task_stateful(task, backend.clone()).await,
            };
            for result in results {
                self.progress_sink.record_evaluation(EvaluationObservation {
                    project: project_id.as_str(),
                    agent_id: result.web_agent_id.as_str(),
                    final_score: result.final_score,
                    total_ms: result.feedback.total_execution_time_ms,
                });
                global.record(&result);
                rollup.entry(result.web_agent_id.clone()).or_default().insert(
                    task.id.clone(),
                    TaskOutcome {
                        prompt: task.prompt.clone(),
                        score: result.final_score,
                        use_case: task.use_case.clone(),
                    },
                );
            }
        }
        rollup
    }

    /// Concurrent mode: every agent proposes a full solution up front
    /// (`solve_task`), under the global `max_parallel_agent_calls`
    /// semaphore; an agent that errors or times out counts as a zero
    /// score rather than aborting the task (spec.md §4.5 retry policy).
    async fn run_task_concurrent(
        &self,
        task: &Task,
        backend: Arc<dyn BackendService>,
    ) -> Vec<bench_types::EvaluationResult> {
        let solve_futures = self.agents.iter().map(|(agent_id, agent)| {
            let agent = agent.clone();
            let agent_id = agent_id.clone();
            let backend = backend.clone();
            let semaphore = self.agent_call_semaphore.clone();
            let task = task.clone();
            let use_cache = self.config.use_cached_solutions;
            let cache = self.solution_cache.clone();
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(agent_id = %agent_id, "agent call semaphore closed");
                        return TaskSolution {
                            task_id: task.id.clone(),
                            web_agent_id: agent_id.clone(),
                            actions: Vec::new(),
                            recording: None,
                        };
                    }
                };
                if let Err(err) = backend.reset(agent_id.as_str()).await {
                    warn!(agent_id = %agent_id, "per-attempt backend reset failed: {}", err);
                }

                if use_cache {
                    if let Some(record) = cache.get(task.id.as_str(), agent_id.as_str()).await {
                        return record.solution;
                    }
                }

                let solution = match agent.solve_task(&task).await {
                    Ok(solution) => solution,
                    Err(err) => {
                        warn!(agent_id = %agent_id, task_id = %task.id, "agent call failed: {}", err);
                        TaskSolution {
                            task_id: task.id.clone(),
                            web_agent_id: agent_id.clone(),
                            actions: Vec::new(),
                            recording: None,
                        }
                    }
                };

                if use_cache {
                    let timestamp = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0);
                    let record = SolutionRecord {
                        agent_id: agent_id.as_str().to_string(),
                        agent_name: agent_id.as_str().to_string(),
                        timestamp,
                        solution: solution.clone(),
                    };
                    if let Err(err) = cache.put(task.id.as_str(), agent_id.as_str(), record).await {
                        warn!(agent_id = %agent_id, "solution cache write failed: {}", err);
                    }
                }
                solution
            }
        });
        let solutions = join_all(solve_futures).await;
        self.evaluator.evaluate_batch(task, solutions).await
    }

    /// Stateful mode: every agent drives its own interleaved episode
    /// (spec.md §4.6), then the episode's concatenated history is scored
    /// through the same predicate/feedback/baseline pipeline
    /// `evaluate_inner` uses, via `Evaluator::score_history`.
    async fn run_task_stateful(
        &self,
        task: &Task,
        backend: Arc<dyn BackendService>,
    ) -> Vec<bench_types::EvaluationResult> {
        let episodes = self.agents.iter().map(|(agent_id, agent)| {
            let agent = agent.clone();
            let agent_id = agent_id.clone();
            let backend = backend.clone();
            let semaphore = self.agent_call_semaphore.clone();
            let task = task.clone();
            let driver = self.evaluator_driver();
            let executor_config = self.evaluator_executor_config();
            let max_steps = self.config.max_steps_per_task;
            let evaluator = self.evaluator.clone();
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(agent_id = %agent_id, "agent call semaphore closed");
                        return bench_types::EvaluationResult::empty(task.id.clone(), agent_id);
                    }
                };
                let episode =
                    run_stateful_episode(driver, backend, agent, &task, executor_config, max_steps).await;
                let proposed_action_count = episode.history.len();
                evaluator
                    .score_history(
                        &task,
                        agent_id,
                        episode.history,
                        proposed_action_count,
                        episode.truncated,
                        None,
                    )
                    .await
            }
        });
        join_all(episodes).await
    }

    fn evaluator_driver(&self) -> Arc<dyn bench_browser::BrowserDriver> {
        self.evaluator.driver()
    }

    fn evaluator_executor_config(&self) -> bench_browser::ExecutorConfig {
        self.evaluator.executor_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bench_agent::AgentError;
    use bench_backend::NullBackendService;
    use bench_browser::ScriptedDriver;
    use bench_cache::BaselineCache;
    use bench_evaluator::EvaluatorConfig;
    use bench_feedback::FeedbackAggregator;
    use bench_observe::NullSink;
    use bench_predicates::judge::NullJudge;
    use bench_predicates::TestRunner;
    use bench_types::{Action, Predicate, TaskId};
    use std::collections::BTreeMap as Map;

    struct OneShotAgent {
        id: AgentId,
        url: String,
    }

    #[async_trait]
    impl Agent for OneShotAgent {
        fn agent_id(&self) -> &str {
            self.id.as_str()
        }

        async fn solve_task(&self, task: &Task) -> Result<TaskSolution, AgentError> {
            Ok(TaskSolution {
                task_id: task.id.clone(),
                web_agent_id: self.id.clone(),
                actions: vec![Action::Navigate { url: self.url.clone() }],
                recording: None,
            })
        }

        async fn act(&self, _state: &bench_agent::AgentState, _history: &[bench_types::ActionResult]) -> Result<Vec<Action>, AgentError> {
            Ok(Vec::new())
        }
    }

    struct FixedTasks(Vec<Task>);

    #[async_trait]
    impl TaskSource for FixedTasks {
        async fn load_tasks(&self, _project: &ProjectId, _use_cached: bool) -> Result<Vec<Task>, OrchestratorError> {
            Ok(self.0.clone())
        }
    }

    struct SingleBackend(Arc<dyn BackendService>);

    impl ProjectBackends for SingleBackend {
        fn backend_for(&self, _project: &ProjectId) -> Option<Arc<dyn BackendService>> {
            Some(self.0.clone())
        }
    }

    fn task(project_id: ProjectId) -> Task {
        Task {
            id: TaskId::new(),
            project_id,
            prompt: "go home".into(),
            start_url: "http://x/".into(),
            predicates: vec![Predicate::UrlReached { expected: "/home".into() }],
            use_case: Some("navigation".into()),
            relevant_data: Map::new(),
            is_real_web: false,
            screen_width: 1280,
            screen_height: 800,
        }
    }

    fn evaluator(driver: Arc<ScriptedDriver>) -> Arc<Evaluator> {
        Arc::new(Evaluator::new(
            driver,
            Arc::new(NullBackendService),
            Arc::new(BaselineCache::new()),
            Arc::new(TestRunner::new(Arc::new(NullJudge))),
            Arc::new(FeedbackAggregator::new(Default::default())),
            EvaluatorConfig {
                chunk_size: 2,
                executor_config: bench_browser::ExecutorConfig {
                    inter_action_delay: std::time::Duration::ZERO,
                    ..Default::default()
                },
                ..Default::default()
            },
        ))
    }

    #[tokio::test]
    async fn concurrent_mode_scores_every_agent_against_every_task() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        driver.push_transition("http://x/home", "<html>home</html>");
        let evaluator = evaluator(driver);

        let project_id = ProjectId::from("proj-1");
        let cfg = BenchmarkConfig {
            projects: vec![project_id.clone()],
            agents: vec![AgentId::from("agent-a")],
            runs: 1,
            use_cached_solutions: false,
            ..Default::default()
        };
        cfg.validate().unwrap();

        let mut agents: BTreeMap<AgentId, Arc<dyn Agent>> = BTreeMap::new();
        agents.insert(
            AgentId::from("agent-a"),
            Arc::new(OneShotAgent {
                id: AgentId::from("agent-a"),
                url: "http://x/home".into(),
            }),
        );

        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(SolutionCache::open(dir.path()).await);
        let task_source = Arc::new(FixedTasks(vec![task(project_id.clone())]));
        let backends: Arc<dyn ProjectBackends> = Arc::new(SingleBackend(Arc::new(NullBackendService)));

        let orchestrator = Orchestrator::new(
            cfg,
            agents,
            task_source,
            backends,
            evaluator,
            cache,
            Arc::new(NullSink),
        );

        let reports = orchestrator.run().await;
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert!(report.succeeded);
        assert_eq!(report.run_rollups.len(), 1);
        let agent_tasks = &report.run_rollups[0][&AgentId::from("agent-a")];
        assert_eq!(agent_tasks.len(), 1);
        assert!(report.global[&AgentId::from("agent-a")].total == 1);
    }

    #[tokio::test]
    async fn unknown_project_backend_fails_that_project_only() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        let evaluator = evaluator(driver);
        let cfg = BenchmarkConfig {
            projects: vec![ProjectId::from("missing-project")],
            agents: vec![AgentId::from("agent-a")],
            ..Default::default()
        };
        let mut agents: BTreeMap<AgentId, Arc<dyn Agent>> = BTreeMap::new();
        agents.insert(
            AgentId::from("agent-a"),
            Arc::new(OneShotAgent {
                id: AgentId::from("agent-a"),
                url: "http://x/home".into(),
            }),
        );
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(SolutionCache::open(dir.path()).await);
        let task_source = Arc::new(FixedTasks(vec![]));
        struct NoBackends;
        impl ProjectBackends for NoBackends {
            fn backend_for(&self, _project: &ProjectId) -> Option<Arc<dyn BackendService>> {
                None
            }
        }
        let orchestrator = Orchestrator::new(
            cfg,
            agents,
            task_source,
            Arc::new(NoBackends),
            evaluator,
            cache,
            Arc::new(NullSink),
        );
        let reports = orchestrator.run().await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].succeeded);
    }
}
