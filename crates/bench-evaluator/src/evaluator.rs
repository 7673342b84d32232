//! The Evaluator (C10): for one `(task, solution)` or a batch of
//! solutions sharing a task, drives the action-replay pipeline end to
//! end — reset, isolated browser context, sequential action execution,
//! predicate evaluation, feedback aggregation, and random-baseline
//! subtraction — and never lets a failure escape as an `Err`; every
//! outcome is a scored [`EvaluationResult`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bench_agent::{Agent, RandomClickerAgent};
use bench_backend::BackendService;
use bench_browser::{BrowserDriver, BrowserExecutor};
use bench_cache::BaselineCache;
use bench_feedback::FeedbackAggregator;
use bench_predicates::TestRunner;
use bench_types::{
    fingerprint, Action, ActionResult, AgentId, EvaluationResult, PhaseTimings, Task, TaskSolution,
};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::EvaluatorConfig;

pub struct Evaluator {
    driver: Arc<dyn BrowserDriver>,
    backend: Arc<dyn BackendService>,
    baseline_cache: Arc<BaselineCache>,
    test_runner: Arc<TestRunner>,
    feedback: Arc<FeedbackAggregator>,
    chunk_semaphore: Arc<Semaphore>,
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        backend: Arc<dyn BackendService>,
        baseline_cache: Arc<BaselineCache>,
        test_runner: Arc<TestRunner>,
        feedback: Arc<FeedbackAggregator>,
        config: EvaluatorConfig,
    ) -> Self {
        let chunk_semaphore = Arc::new(Semaphore::new(config.chunk_size.max(1)));
        Self {
            driver,
            backend,
            baseline_cache,
            test_runner,
            feedback,
            chunk_semaphore,
            config,
        }
    }

    /// The driver this evaluator was built with. Exposed so stateful-mode
    /// orchestration can drive its own interleaved episode through the
    /// same browser backend rather than duplicating driver wiring.
    pub fn driver(&self) -> Arc<dyn BrowserDriver> {
        self.driver.clone()
    }

    pub fn executor_config(&self) -> bench_browser::ExecutorConfig {
        self.config.executor_config.clone()
    }

    /// Evaluate one `(task, solution)` pair.
    pub async fn evaluate_single(&self, task: &Task, solution: TaskSolution) -> EvaluationResult {
        if solution.actions.is_empty() {
            return EvaluationResult::empty(task.id.clone(), solution.web_agent_id.clone());
        }
        self.evaluate_inner(task, solution).await
    }

    /// Evaluate many solutions to the same task, deduplicating identical
    /// pre-substitution action lists and evaluating one representative per
    /// group under the `chunk_size` concurrency bound (spec §4.4).
    pub async fn evaluate_batch(&self, task: &Task, solutions: Vec<TaskSolution>) -> Vec<EvaluationResult> {
        if solutions.is_empty() {
            return Vec::new();
        }

        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, solution) in solutions.iter().enumerate() {
            groups
                .entry(fingerprint(&solution.actions))
                .or_default()
                .push(idx);
        }
        info!(
            task_id = %task.id,
            solutions = solutions.len(),
            groups = groups.len(),
            "evaluating batch"
        );

        let group_runs = groups.into_iter().map(|(_, indices)| {
            let representative = solutions[indices[0]].clone();
            async move {
                let result = if representative.actions.is_empty() {
                    None
                } else {
                    Some(self.evaluate_inner(task, representative).await)
                };
                (indices, result)
            }
        });
        let grouped = futures::future::join_all(group_runs).await;

        let mut results: Vec<Option<EvaluationResult>> = (0..solutions.len()).map(|_| None).collect();
        for (indices, maybe_result) in grouped {
            for idx in indices {
                results[idx] = Some(match &maybe_result {
                    Some(representative_result) => {
                        let mut r = representative_result.clone();
                        r.web_agent_id = solutions[idx].web_agent_id.clone();
                        r
                    }
                    None => EvaluationResult::empty(task.id.clone(), solutions[idx].web_agent_id.clone()),
                });
            }
        }
        results.into_iter().map(|r| r.expect("every index assigned")).collect()
    }

    /// Scores a history that was already produced elsewhere (the stateful
    /// orchestrator mode drives the browser itself, interleaving agent
    /// calls between steps, and hands the orchestrator's own
    /// `ActionResult` trail back here for the same predicate/feedback/
    /// baseline pipeline `evaluate_inner` uses for concurrent mode).
    pub async fn score_history(
        &self,
        task: &Task,
        web_agent_id: AgentId,
        history: Vec<ActionResult>,
        proposed_action_count: usize,
        truncated: bool,
        recording: Option<String>,
    ) -> EvaluationResult {
        let task_for_baseline = task.clone();
        let baseline_start = Instant::now();
        let random_baseline_score = self
            .baseline_cache
            .get_or_compute(task.id.as_str(), || self.compute_baseline(task_for_baseline))
            .await;
        let random_baseline_ms = baseline_start.elapsed().as_millis() as u64;

        let test_start = Instant::now();
        let matrix = self.test_runner.run_tests(task, &history).await;
        let test_execution_ms = test_start.elapsed().as_millis() as u64;

        let (raw_score, mut feedback) =
            self.feedback
                .aggregate(&matrix, &history, proposed_action_count, truncated);
        let final_score = (raw_score - random_baseline_score).max(0.0);
        feedback.explanation = format!(
            "{} (baseline={:.2}, final={:.2})",
            feedback.explanation, random_baseline_score, final_score
        );

        EvaluationResult {
            task_id: task.id.clone(),
            web_agent_id,
            final_score,
            raw_score,
            random_baseline_score,
            execution_history: history,
            test_results_matrix: matrix,
            feedback,
            phase_timings: PhaseTimings {
                browser_setup_ms: 0,
                action_execution_ms: 0,
                test_execution_ms,
                random_baseline_ms,
            },
            gif_recording: recording,
        }
    }

    /// Full five-phase protocol for one non-empty solution: reset, open
    /// context, run actions, close, then compute (or reuse the cached)
    /// random baseline, then score. The baseline step runs after this
    /// solution's context permit is released rather than alongside it,
    /// since both compete for the same bounded `chunk_semaphore`.
    async fn evaluate_inner(&self, task: &Task, solution: TaskSolution) -> EvaluationResult {
        let web_agent_id = solution.web_agent_id.clone();
        let substituted: Vec<Action> = solution
            .actions
            .iter()
            .map(|a| a.substitute_agent_id(web_agent_id.as_str()))
            .collect();

        let setup_start = Instant::now();
        if let Err(err) = self.backend.reset(web_agent_id.as_str()).await {
            warn!(agent_id = %web_agent_id, "backend reset failed: {}", err);
        }
        let permit = match self.chunk_semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return self.internal_error_result(task, web_agent_id, "semaphore closed"),
        };
        let mut executor = match BrowserExecutor::open(
            self.driver.clone(),
            self.backend.clone(),
            web_agent_id.as_str(),
            self.config.executor_config.clone(),
        )
        .await
        {
            Ok(e) => e,
            Err(err) => return self.internal_error_result(task, web_agent_id, err),
        };
        let browser_setup_ms = setup_start.elapsed().as_millis() as u64;

        let action_start = Instant::now();
        let mut history: Vec<ActionResult> = Vec::with_capacity(substituted.len());
        for (step_index, action) in substituted.into_iter().enumerate() {
            let result = executor.execute(action, step_index).await;
            let fatal = result
                .error
                .as_ref()
                .map(|e| e.kind.is_fatal_to_solution())
                .unwrap_or(false);
            history.push(result);
            if fatal {
                break;
            }
        }
        executor.close().await;
        let action_execution_ms = action_start.elapsed().as_millis() as u64;
        // Release this solution's context permit before requesting the
        // baseline's own permit on the same semaphore. The baseline may
        // still need to open its own browser context (cache miss), and
        // holding this permit across that wait is how two evaluations in
        // flight deadlock each other: each holds the permit the other's
        // baseline is waiting to acquire.
        drop(permit);

        let baseline_start = Instant::now();
        let task_for_baseline = task.clone();
        let random_baseline_score = self
            .baseline_cache
            .get_or_compute(task.id.as_str(), || self.compute_baseline(task_for_baseline))
            .await;
        let random_baseline_ms = baseline_start.elapsed().as_millis() as u64;

        let test_start = Instant::now();
        let matrix = self.test_runner.run_tests(task, &history).await;
        let test_execution_ms = test_start.elapsed().as_millis() as u64;

        let (raw_score, mut feedback) =
            self.feedback
                .aggregate(&matrix, &history, solution.actions.len(), false);
        let final_score = (raw_score - random_baseline_score).max(0.0);
        feedback.explanation = format!(
            "{} (baseline={:.2}, final={:.2})",
            feedback.explanation, random_baseline_score, final_score
        );

        EvaluationResult {
            task_id: task.id.clone(),
            web_agent_id,
            final_score,
            raw_score,
            random_baseline_score,
            execution_history: history,
            test_results_matrix: matrix,
            feedback,
            phase_timings: PhaseTimings {
                browser_setup_ms,
                action_execution_ms,
                test_execution_ms,
                random_baseline_ms,
            },
            gif_recording: solution.recording,
        }
    }

    /// Runs the random-clicker agent through a reduced pipeline (no nested
    /// baseline computation) and returns its `raw_score`. Failures of any
    /// kind fall back to a baseline of `0.0` rather than poisoning the
    /// cache with an error.
    async fn compute_baseline(&self, task: Task) -> f64 {
        let baseline_start = Instant::now();
        let clicker = RandomClickerAgent::new(format!("baseline-{}", task.id));
        let solution = match clicker.solve_task(&task).await {
            Ok(s) => s,
            Err(_) => return 0.0,
        };
        if solution.actions.is_empty() {
            return 0.0;
        }
        let agent_id = solution.web_agent_id.clone();
        let substituted: Vec<Action> = solution
            .actions
            .iter()
            .map(|a| a.substitute_agent_id(agent_id.as_str()))
            .collect();

        if let Err(err) = self.backend.reset(agent_id.as_str()).await {
            warn!(agent_id = %agent_id, "baseline backend reset failed: {}", err);
        }
        let permit = match self.chunk_semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return 0.0,
        };
        let mut executor = match BrowserExecutor::open(
            self.driver.clone(),
            self.backend.clone(),
            agent_id.as_str(),
            self.config.executor_config.clone(),
        )
        .await
        {
            Ok(e) => e,
            Err(_) => return 0.0,
        };

        let mut history: Vec<ActionResult> = Vec::with_capacity(substituted.len());
        for (step_index, action) in substituted.into_iter().enumerate() {
            let result = executor.execute(action, step_index).await;
            let fatal = result
                .error
                .as_ref()
                .map(|e| e.kind.is_fatal_to_solution())
                .unwrap_or(false);
            history.push(result);
            if fatal {
                break;
            }
        }
        executor.close().await;
        drop(permit);

        let matrix = self.test_runner.run_tests(&task, &history).await;
        let (raw_score, _) = self.feedback.aggregate(&matrix, &history, solution.actions.len(), false);
        info!(
            task_id = %task.id,
            raw_score,
            elapsed_ms = baseline_start.elapsed().as_millis() as u64,
            "computed random-clicker baseline"
        );
        raw_score
    }

    fn internal_error_result(
        &self,
        task: &Task,
        web_agent_id: AgentId,
        cause: impl std::fmt::Display,
    ) -> EvaluationResult {
        let mut result = EvaluationResult::empty(task.id.clone(), web_agent_id);
        result.feedback.explanation = format!("internal error: {cause}");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_backend::NullBackendService;
    use bench_browser::ScriptedDriver;
    use bench_predicates::judge::NullJudge;
    use bench_types::{AgentId, ProjectId, Predicate, Selector, TaskId};
    use std::collections::BTreeMap;

    fn task_with(predicates: Vec<Predicate>) -> Task {
        Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            prompt: "go home".into(),
            start_url: "http://x/".into(),
            predicates,
            use_case: None,
            relevant_data: BTreeMap::new(),
            is_real_web: false,
            screen_width: 1280,
            screen_height: 800,
        }
    }

    fn evaluator(driver: Arc<ScriptedDriver>) -> Evaluator {
        Evaluator::new(
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
        )
    }

    #[tokio::test]
    async fn empty_solution_short_circuits_without_touching_the_browser() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        let evaluator = evaluator(driver);
        let task = task_with(vec![Predicate::UrlReached { expected: "/home".into() }]);
        let solution = TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: AgentId::from("agent-1"),
            actions: vec![],
            recording: None,
        };
        let result = evaluator.evaluate_single(&task, solution).await;
        assert_eq!(result.final_score, 0.0);
        assert!(result.execution_history.is_empty());
        assert!(result.test_results_matrix.is_empty());
    }

    #[tokio::test]
    async fn single_navigate_reaching_target_scores_above_baseline() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        driver.push_transition("http://x/home", "<html>home</html>");
        let evaluator = evaluator(driver);
        let task = task_with(vec![Predicate::UrlReached { expected: "/home".into() }]);
        let solution = TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: AgentId::from("agent-1"),
            actions: vec![Action::Navigate {
                url: "http://x/home".into(),
            }],
            recording: None,
        };
        let result = evaluator.evaluate_single(&task, solution).await;
        assert_eq!(result.raw_score, 1.0);
        assert_eq!(result.test_results_matrix.len(), 1);
        assert!(result.final_score <= result.raw_score);
    }

    #[tokio::test]
    async fn batch_dedups_identical_action_lists_to_one_browser_run() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        driver.push_transition("http://x/home", "<html>home</html>");
        let evaluator = evaluator(driver);
        let task = task_with(vec![Predicate::UrlReached { expected: "/home".into() }]);
        let actions = vec![Action::Navigate {
            url: "http://x/home".into(),
        }];
        let a = TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: AgentId::from("agent-a"),
            actions: actions.clone(),
            recording: None,
        };
        let b = TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: AgentId::from("agent-b"),
            actions,
            recording: None,
        };
        let results = evaluator.evaluate_batch(&task, vec![a, b]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].final_score, results[1].final_score);
        assert_eq!(results[0].raw_score, results[1].raw_score);
        assert_ne!(results[0].web_agent_id, results[1].web_agent_id);
    }

    #[tokio::test]
    async fn selector_not_found_is_non_fatal_and_subsequent_actions_run() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        let missing = Selector::Css { expr: "#missing".into() };
        driver.fail_selector(&missing);
        driver.push_transition("http://x/done", "<html>done</html>");
        let evaluator = evaluator(driver);
        let task = task_with(vec![Predicate::UrlReached { expected: "/done".into() }]);
        let solution = TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: AgentId::from("agent-1"),
            actions: vec![
                Action::Click { selector: missing },
                Action::Navigate {
                    url: "http://x/done".into(),
                },
            ],
            recording: None,
        };
        let result = evaluator.evaluate_single(&task, solution).await;
        assert_eq!(result.execution_history.len(), 2);
        assert!(!result.execution_history[0].successfully_executed);
        assert_eq!(result.raw_score, 1.0);
    }
}
