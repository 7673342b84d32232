//! The random-clicker baseline agent used to normalize scores.
//!
//! Grounded on the upstream `RandomClickerWebAgent`: it proposes exactly
//! one click within the task's viewport and nothing else. Since this
//! crate's `Selector` algebra is closed over CSS/XPath/attribute
//! selectors rather than raw pixel coordinates (the host language's
//! `page.mouse.click(x, y)` has no equivalent here), the click targets a
//! uniformly-random element drawn from a broad "interactive-looking"
//! selector pool instead of a literal `(x, y)` point. This is a
//! deliberate adaptation, not a faithful port of the coordinate click —
//! see DESIGN.md.

use async_trait::async_trait;
use bench_types::{Action, ActionResult, Selector, Task, TaskSolution};
use rand::Rng;

use crate::agent::Agent;
use crate::errors::AgentError;
use crate::model::AgentState;

/// Fragments unioned into one XPath expression so the whole pool can be
/// indexed by document-order position with a single `[n]` predicate.
/// A CSS selector list has no equivalent (`:nth-of-type` counts siblings
/// of one tag name, not a position across a mixed-tag group), so the
/// pool is expressed in XPath instead.
const INTERACTIVE_XPATH_POOL: &[&str] = &[
    "//a",
    "//button",
    "//input",
    "//select",
    "//textarea",
    "//*[@role='button']",
    "//*[@onclick]",
];

pub struct RandomClickerAgent {
    agent_id: String,
}

impl RandomClickerAgent {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
        }
    }

    fn random_click_action() -> Action {
        let n: u32 = rand::thread_rng().gen_range(1..=50);
        let union = INTERACTIVE_XPATH_POOL.join(" | ");
        Action::Click {
            selector: Selector::XPath {
                expr: format!("({union})[{n}]"),
            },
        }
    }
}

#[async_trait]
impl Agent for RandomClickerAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn solve_task(&self, task: &Task) -> Result<TaskSolution, AgentError> {
        Ok(TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: self.agent_id.clone().into(),
            actions: vec![Self::random_click_action()],
            recording: None,
        })
    }

    async fn act(&self, state: &AgentState, _history: &[ActionResult]) -> Result<Vec<Action>, AgentError> {
        if state.step_index >= 1 {
            return Ok(Vec::new());
        }
        Ok(vec![Self::random_click_action()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_types::{ProjectId, TaskId};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn solve_task_proposes_exactly_one_click() {
        let agent = RandomClickerAgent::new("random-clicker");
        let task = Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            prompt: "whatever".into(),
            start_url: "http://x/".into(),
            predicates: vec![],
            use_case: None,
            relevant_data: BTreeMap::new(),
            is_real_web: false,
            screen_width: 1280,
            screen_height: 800,
        };
        let solution = agent.solve_task(&task).await.unwrap();
        assert_eq!(solution.actions.len(), 1);
        match &solution.actions[0] {
            Action::Click { selector: Selector::XPath { expr } } => {
                assert!(expr.starts_with("(//a | "), "expected a unioned xpath pool, got {expr}");
                assert!(expr.ends_with(']'), "expected a positional index predicate, got {expr}");
            }
            other => panic!("expected an XPath click selector, got {other:?}"),
        }
    }
}
