//! TestRunner: evaluates every predicate of a task against every step of
//! an execution history and emits the step x predicate matrix.

use std::sync::Arc;

use bench_types::{ActionResult, CriteriaOp, Predicate, Snapshot, Task, TestResult, TestResultsMatrix};
use tracing::{debug, warn};

use crate::criteria::apply as apply_criterion;
use crate::judge::{Judge, JudgeError};

pub struct TestRunner {
    judge: Arc<dyn Judge>,
}

impl TestRunner {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }

    /// Build the `step_count x predicate_count` matrix for `task` against
    /// `history`. Only the predicates active for this task (per
    /// `is_real_web`) are included as columns.
    pub async fn run_tests(&self, task: &Task, history: &[ActionResult]) -> TestResultsMatrix {
        let predicates = task.active_predicates();
        let mut matrix = Vec::with_capacity(history.len());
        for result in history {
            let snapshot = &result.browser_snapshot;
            let mut row = Vec::with_capacity(predicates.len());
            for predicate in &predicates {
                row.push(self.evaluate(predicate, snapshot).await);
            }
            matrix.push(row);
        }
        matrix
    }

    async fn evaluate(&self, predicate: &Predicate, snapshot: &Snapshot) -> TestResult {
        match predicate {
            Predicate::UrlReached { expected } => {
                if snapshot.current_url.contains(expected.as_str()) {
                    TestResult::pass()
                } else {
                    TestResult::fail()
                }
            }
            Predicate::HtmlContains { keywords } => {
                let haystack = snapshot.current_html.to_lowercase();
                let hit = keywords
                    .iter()
                    .any(|kw| haystack.contains(&kw.to_lowercase()));
                if hit {
                    TestResult::pass()
                } else {
                    TestResult::fail()
                }
            }
            Predicate::BackendEvent { name, criteria } => {
                let matched = snapshot.backend_events.iter().any(|event| {
                    event.event_type == *name
                        && criteria.iter().all(|(field, criterion)| {
                            let op = criterion.operator;
                            match event.data.get(field) {
                                Some(actual) => apply_criterion(op, actual, &criterion.value),
                                None => false,
                            }
                        })
                });
                if matched {
                    TestResult::pass()
                } else {
                    TestResult::fail()
                }
            }
            Predicate::PageViewEvent { url_substring } => {
                const PAGE_VIEW_EVENT_TYPE: &str = "page_view";
                let matched = snapshot.backend_events.iter().any(|event| {
                    event.event_type == PAGE_VIEW_EVENT_TYPE
                        && event
                            .data
                            .get("url")
                            .and_then(|v| v.as_str())
                            .map(|url| url.contains(url_substring.as_str()))
                            .unwrap_or(false)
                });
                if matched {
                    TestResult::pass()
                } else {
                    TestResult::fail()
                }
            }
            Predicate::HtmlJudge { success_criteria } => {
                self.run_judge_with_retry(|| {
                    self.judge
                        .judge_html(success_criteria, &snapshot.prev_html, &snapshot.current_html)
                })
                .await
            }
            Predicate::ScreenshotJudge { success_criteria } => {
                self.run_judge_with_retry(|| {
                    self.judge.judge_screenshot(
                        success_criteria,
                        snapshot.screenshot_before.as_deref(),
                        snapshot.screenshot_after.as_deref(),
                    )
                })
                .await
            }
        }
    }

    /// Retries a network error once; exhaustion is treated as `false`
    /// rather than propagated, matching the runner's "judge failure is
    /// not a pipeline failure" contract.
    async fn run_judge_with_retry<'a, F, Fut>(&'a self, call: F) -> TestResult
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<bool, JudgeError>> + 'a,
    {
        match call().await {
            Ok(true) => TestResult::pass(),
            Ok(false) => TestResult::fail(),
            Err(err) if err.is_retryable() => {
                debug!("judge call failed, retrying once: {}", err);
                match call().await {
                    Ok(true) => TestResult::pass(),
                    Ok(false) => TestResult::fail(),
                    Err(err) => {
                        warn!("judge call exhausted retries: {}", err);
                        TestResult::fail()
                    }
                }
            }
            Err(err) => {
                warn!("judge call failed (non-retryable): {}", err);
                TestResult::fail()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bench_types::{Action, BackendEvent, ErrorKind, ProjectId, Selector, StepError, TaskId};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(iteration: usize, url: &str, html: &str) -> Snapshot {
        Snapshot {
            iteration,
            current_url: url.to_string(),
            current_html: html.to_string(),
            prev_html: String::new(),
            backend_events: Vec::new(),
            screenshot_before: None,
            screenshot_after: None,
            action: Action::Navigate { url: url.to_string() },
            timestamp: Utc::now(),
        }
    }

    fn action_result(snapshot: Snapshot) -> ActionResult {
        ActionResult {
            browser_snapshot: snapshot,
            successfully_executed: true,
            execution_time_ms: 10,
            error: None,
        }
    }

    fn task_with(predicates: Vec<Predicate>, is_real_web: bool) -> Task {
        Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            prompt: "test".into(),
            start_url: "http://x/".into(),
            predicates,
            use_case: None,
            relevant_data: BTreeMap::new(),
            is_real_web,
            screen_width: 1280,
            screen_height: 800,
        }
    }

    #[tokio::test]
    async fn url_reached_matches_substring() {
        let runner = TestRunner::new(Arc::new(crate::judge::NullJudge));
        let task = task_with(vec![Predicate::UrlReached { expected: "/home".into() }], false);
        let history = vec![action_result(snapshot(0, "http://x/home", ""))];
        let matrix = runner.run_tests(&task, &history).await;
        assert_eq!(matrix.len(), 1);
        assert!(matrix[0][0].success);
    }

    #[tokio::test]
    async fn real_web_task_excludes_backend_predicates() {
        let runner = TestRunner::new(Arc::new(crate::judge::NullJudge));
        let task = task_with(
            vec![
                Predicate::BackendEvent {
                    name: "login".into(),
                    criteria: BTreeMap::new(),
                },
                Predicate::HtmlContains {
                    keywords: vec!["Welcome".into()],
                },
            ],
            true,
        );
        let history = vec![action_result(snapshot(0, "http://x/", "Welcome back"))];
        let matrix = runner.run_tests(&task, &history).await;
        assert_eq!(matrix[0].len(), 1);
        assert!(matrix[0][0].success);
    }

    #[tokio::test]
    async fn backend_event_criteria_all_must_match() {
        let mut data = serde_json::Map::new();
        data.insert("status".into(), serde_json::json!("ok"));
        let mut snap = snapshot(0, "http://x/", "");
        snap.backend_events.push(BackendEvent {
            event_type: "order_placed".into(),
            data,
            timestamp: Utc::now(),
        });
        let mut criteria = BTreeMap::new();
        criteria.insert(
            "status".into(),
            bench_types::Criterion {
                operator: CriteriaOp::Equals,
                value: serde_json::json!("ok"),
            },
        );
        let runner = TestRunner::new(Arc::new(crate::judge::NullJudge));
        let task = task_with(
            vec![Predicate::BackendEvent {
                name: "order_placed".into(),
                criteria,
            }],
            false,
        );
        let matrix = runner.run_tests(&task, &[action_result(snap)]).await;
        assert!(matrix[0][0].success);
    }

    struct FlakyJudge {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Judge for FlakyJudge {
        async fn judge_html(&self, _: &str, _: &str, _: &str) -> Result<bool, JudgeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(JudgeError::Network("timeout".into()))
            } else {
                Ok(true)
            }
        }
        async fn judge_screenshot(&self, _: &str, _: Option<&str>, _: Option<&str>) -> Result<bool, JudgeError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn html_judge_retries_network_error_once() {
        let runner = TestRunner::new(Arc::new(FlakyJudge {
            calls: AtomicUsize::new(0),
        }));
        let task = task_with(
            vec![Predicate::HtmlJudge {
                success_criteria: "page shows a confirmation".into(),
            }],
            false,
        );
        let matrix = runner
            .run_tests(&task, &[action_result(snapshot(0, "http://x/", ""))])
            .await;
        assert!(matrix[0][0].success);
    }

    #[test]
    fn selector_not_found_is_non_fatal_at_the_action_level() {
        let err = StepError::new(ErrorKind::SelectorNotFound, "no match for css:#missing");
        assert!(!err.kind.is_fatal_to_solution());
        let _ = Selector::Css { expr: "#missing".into() };
    }
}
