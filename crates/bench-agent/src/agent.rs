//! The `Agent` interface: remote black boxes proposing actions.

use async_trait::async_trait;
use bench_types::{Action, ActionResult, Task, TaskSolution};

use crate::errors::AgentError;
use crate::model::AgentState;

/// An agent proposes actions for a task, either all at once (`solve_task`)
/// or one step at a time while observing browser state (`act`). Agents
/// are treated as remote black boxes; this crate owns only the transport
/// and the random-clicker baseline, never a "real" planning agent.
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_id(&self) -> &str;

    /// One-shot: propose a full action sequence up front.
    async fn solve_task(&self, task: &Task) -> Result<TaskSolution, AgentError>;

    /// Iterative: propose the next action(s) given current state and
    /// history. An empty vec ends the episode.
    async fn act(&self, state: &AgentState, history: &[ActionResult]) -> Result<Vec<Action>, AgentError>;
}
