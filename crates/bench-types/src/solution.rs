//! A proposed solution and its content-addressed fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::action::Action;
use crate::ids::{AgentId, TaskId};

/// An ordered list of actions proposed by an agent for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSolution {
    pub task_id: TaskId,
    pub web_agent_id: AgentId,
    pub actions: Vec<Action>,
    pub recording: Option<String>,
}

/// SHA-256 over the canonicalized, pipe-joined tagged-variant JSON of each
/// action — the solution fingerprint used for batch deduplication.
///
/// Hashing happens on the action list exactly as returned by the agent,
/// before the `<web_agent_id>` placeholder is substituted: two solutions
/// with the same pre-substitution actions but different agent ids share a
/// fingerprint and are evaluated together. This mirrors upstream behavior
/// and is flagged as an open question rather than "fixed" — see DESIGN.md.
pub fn fingerprint(actions: &[Action]) -> String {
    let joined = actions
        .iter()
        .map(|a| a.canonical_json().to_string())
        .collect::<Vec<_>>()
        .join("|");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Selector;

    #[test]
    fn identical_action_lists_share_a_fingerprint() {
        let actions = vec![Action::Navigate {
            url: "http://x/<web_agent_id>".into(),
        }];
        let a = fingerprint(&actions);
        let b = fingerprint(&actions.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn different_selectors_hash_differently() {
        let a = vec![Action::Click {
            selector: Selector::Css { expr: "#a".into() },
        }];
        let b = vec![Action::Click {
            selector: Selector::Css { expr: "#b".into() },
        }];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn empty_action_list_has_a_stable_fingerprint() {
        assert_eq!(fingerprint(&[]), fingerprint(&[]));
    }
}
