//! Stateful (iterative) mode (spec.md §4.6), grounded on the original
//! `run_stateful.py` loop: rather than calling `solve_task` once and
//! replaying the whole action list, the orchestrator interleaves
//! `agent.act` calls with live browser state, one or a few actions at a
//! time, until the agent gives up (empty action list) or
//! `max_steps_per_task` is hit.

use std::sync::Arc;

use bench_agent::{Agent, AgentState};
use bench_backend::BackendService;
use bench_browser::{BrowserDriver, BrowserExecutor, ExecutorConfig};
use bench_types::{Action, ActionResult, Task};
use tracing::warn;

/// The concatenated execution history of one stateful episode, plus
/// whether it ended because `max_steps_per_task` was hit rather than the
/// agent returning an empty action list (the original's distinguishable
/// "truncated" flag).
pub struct StatefulEpisode {
    pub history: Vec<ActionResult>,
    pub truncated: bool,
}

pub async fn run_stateful_episode(
    driver: Arc<dyn BrowserDriver>,
    backend: Arc<dyn BackendService>,
    agent: Arc<dyn Agent>,
    task: &Task,
    executor_config: ExecutorConfig,
    max_steps: usize,
) -> StatefulEpisode {
    let agent_id = agent.agent_id().to_string();
    if let Err(err) = backend.reset(&agent_id).await {
        warn!(agent_id = %agent_id, "stateful backend reset failed: {}", err);
    }

    let mut executor = match BrowserExecutor::open(driver, backend, agent_id.as_str(), executor_config).await {
        Ok(e) => e,
        Err(err) => {
            warn!(agent_id = %agent_id, "stateful episode could not open browser context: {}", err);
            return StatefulEpisode {
                history: Vec::new(),
                truncated: false,
            };
        }
    };

    // Initial navigation positions the browser at task.start_url and
    // doubles as step 0's captured state; the loop below then interleaves
    // agent.act calls from step 1 onward.
    let mut history = vec![
        executor
            .execute(
                Action::Navigate {
                    url: task.start_url.clone(),
                },
                0,
            )
            .await,
    ];
    let mut step = 1usize;
    let mut truncated = false;

    'episode: while step < max_steps {
        let last = history.last().expect("seeded with the initial navigation");
        let state = AgentState {
            task_id: task.id.clone(),
            prompt: task.prompt.clone(),
            url: last.browser_snapshot.current_url.clone(),
            snapshot_html: last.browser_snapshot.current_html.clone(),
            screenshot: last.browser_snapshot.screenshot_after.clone(),
            step_index: step,
        };

        let actions = match agent.act(&state, &history).await {
            Ok(actions) => actions,
            Err(err) => {
                warn!(agent_id = %agent_id, "agent.act failed, ending episode: {}", err);
                break;
            }
        };
        if actions.is_empty() {
            break;
        }

        for action in actions {
            if step >= max_steps {
                truncated = true;
                break 'episode;
            }
            let result = executor.execute(action, step).await;
            let fatal = result
                .error
                .as_ref()
                .map(|e| e.kind.is_fatal_to_solution())
                .unwrap_or(false);
            history.push(result);
            step += 1;
            if fatal {
                break 'episode;
            }
        }
    }
    if step >= max_steps {
        truncated = true;
    }

    executor.close().await;
    StatefulEpisode { history, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bench_agent::AgentError;
    use bench_backend::NullBackendService;
    use bench_browser::ScriptedDriver;
    use bench_types::{ProjectId, TaskId};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedAgent {
        plan: Mutex<Vec<Vec<Action>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn agent_id(&self) -> &str {
            "scripted-agent"
        }

        async fn solve_task(&self, _task: &Task) -> Result<bench_types::TaskSolution, AgentError> {
            unreachable!("stateful episodes drive act(), not solve_task()")
        }

        async fn act(&self, _state: &AgentState, _history: &[ActionResult]) -> Result<Vec<Action>, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut plan = self.plan.lock().unwrap();
            Ok(if plan.is_empty() { Vec::new() } else { plan.remove(0) })
        }
    }

    fn task() -> Task {
        Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            prompt: "click around".into(),
            start_url: "http://x/".into(),
            predicates: vec![],
            use_case: None,
            relevant_data: BTreeMap::new(),
            is_real_web: false,
            screen_width: 1280,
            screen_height: 800,
        }
    }

    #[tokio::test]
    async fn episode_ends_when_the_agent_returns_no_actions() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        driver.push_transition("http://x/next", "<html>next</html>");
        let agent = Arc::new(ScriptedAgent {
            plan: Mutex::new(vec![vec![Action::Navigate {
                url: "http://x/next".into(),
            }]]),
            calls: AtomicUsize::new(0),
        });
        let episode = run_stateful_episode(
            driver,
            Arc::new(NullBackendService),
            agent,
            &task(),
            ExecutorConfig {
                inter_action_delay: std::time::Duration::ZERO,
                ..Default::default()
            },
            10,
        )
        .await;
        assert!(!episode.truncated);
        assert_eq!(episode.history.len(), 2);
    }

    #[tokio::test]
    async fn episode_truncates_at_max_steps_per_task() {
        let driver = Arc::new(ScriptedDriver::new("http://x/"));
        for i in 0..20 {
            driver.push_transition(&format!("http://x/{i}"), "<html></html>");
        }
        let agent = Arc::new(ScriptedAgent {
            plan: Mutex::new(
                (0..20)
                    .map(|i| {
                        vec![Action::Navigate {
                            url: format!("http://x/{i}"),
                        }]
                    })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        });
        let episode = run_stateful_episode(
            driver,
            Arc::new(NullBackendService),
            agent,
            &task(),
            ExecutorConfig {
                inter_action_delay: std::time::Duration::ZERO,
                ..Default::default()
            },
            3,
        )
        .await;
        assert!(episode.truncated);
        assert_eq!(episode.history.len(), 3);
    }
}
