//! Wire shapes for the Agent HTTP contract (spec §6) and the in-process
//! state handed to iterative agents.

use std::collections::BTreeMap;

use bench_types::{Action, ActionResult, TaskId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// State an iterative agent needs to decide its next actions.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub task_id: TaskId,
    pub prompt: String,
    /// Current URL, rewritten to the local host context the agent drives.
    pub url: String,
    pub snapshot_html: String,
    pub screenshot: Option<String>,
    pub step_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveTaskRequest<'a> {
    pub task_id: &'a str,
    pub prompt: &'a str,
    pub url: &'a str,
    pub web_project_id: &'a str,
    #[serde(default)]
    pub relevant_data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolveTaskResponse {
    pub task_id: String,
    pub web_agent_id: String,
    /// Deserialized element-wise via [`parse_actions_lenient`], not as
    /// `Vec<Action>` directly: `Action` is a closed tagged-variant enum, and
    /// letting serde parse the whole array in one shot means a single
    /// unrecognized `type` among otherwise-valid actions fails the entire
    /// array, discarding every action the agent proposed (spec §6, §8).
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActRequest<'a> {
    pub task_id: &'a str,
    pub prompt: &'a str,
    pub url: &'a str,
    pub snapshot_html: &'a str,
    pub screenshot: Option<&'a str>,
    pub step_index: usize,
    pub history: &'a [ActionResult],
}

/// The three response shapes the `/act` (fallback `/step`) contract
/// accepts. `NavigateUrl` is rewritten by the caller into a single
/// `Navigate` action before it reaches the executor. `actions`/`action`
/// are held as raw JSON, same reasoning as [`SolveTaskResponse::actions`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActResponse {
    Actions { actions: Vec<serde_json::Value> },
    SingleAction { action: serde_json::Value },
    NavigateUrl { navigate_url: String },
}

impl ActResponse {
    pub fn into_actions(self) -> Vec<Action> {
        match self {
            ActResponse::Actions { actions } => parse_actions_lenient(actions),
            ActResponse::SingleAction { action } => parse_actions_lenient(vec![action]),
            ActResponse::NavigateUrl { navigate_url } => vec![Action::Navigate { url: navigate_url }],
        }
    }
}

/// Parses each raw action payload independently, skipping (and logging)
/// any entry whose `type` tag is unrecognized or otherwise malformed
/// instead of failing the whole batch. Matches spec §6 ("Unknown variants
/// are a non-fatal parse error; the offending action is skipped and
/// recorded in `ActionResult.error`") and §8 ("Agent returns unknown
/// action `type` → that action is skipped with `error.kind=Internal`,
/// remaining actions proceed"): at this point in the pipeline there is no
/// browser snapshot yet to attach a `StepError` to, so the skip is
/// recorded as a warning carrying the same `Internal`-class reasoning
/// (unrecognized shape from an otherwise-trusted collaborator) instead.
pub fn parse_actions_lenient(raw: Vec<serde_json::Value>) -> Vec<Action> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Action>(value.clone()) {
            Ok(action) => Some(action),
            Err(err) => {
                warn!(index, raw = %value, "skipping unrecognized action: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_actions_lenient_skips_unknown_type_and_keeps_the_rest() {
        let raw = vec![
            json!({"type": "Navigate", "url": "http://x/home"}),
            json!({"type": "TotallyMadeUp", "whatever": 1}),
            json!({"type": "Click", "selector": {"kind": "Css", "expr": "#go"}}),
        ];
        let actions = parse_actions_lenient(raw);
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], Action::Navigate { .. }));
        assert!(matches!(actions[1], Action::Click { .. }));
    }

    #[test]
    fn solve_task_response_with_one_bad_action_still_parses_the_good_ones() {
        let body = json!({
            "task_id": "t1",
            "web_agent_id": "a1",
            "actions": [
                {"type": "Navigate", "url": "http://x/home"},
                {"type": "NotARealAction"},
            ]
        });
        let response: SolveTaskResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.actions.len(), 2, "raw payload is held verbatim, filtering happens in parse_actions_lenient");
        let actions = parse_actions_lenient(response.actions);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Navigate { .. }));
    }

    #[test]
    fn act_response_with_unknown_action_in_the_array_keeps_the_valid_ones() {
        let body = json!({
            "actions": [
                {"type": "Wait", "duration_ms": 100},
                {"type": "SomeFutureActionKind", "foo": "bar"},
            ]
        });
        let response: ActResponse = serde_json::from_value(body).unwrap();
        let actions = response.into_actions();
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Wait { .. }));
    }
}
