//! The Task value object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, TaskId};
use crate::predicate::Predicate;

/// A fully-formed, machine-checkable task consumed read-only by the core.
///
/// Immutable after construction: task generation is out of scope here, the
/// core only ever reads an already-synthesized `Task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub prompt: String,
    pub start_url: String,
    pub predicates: Vec<Predicate>,
    pub use_case: Option<String>,
    #[serde(default)]
    pub relevant_data: BTreeMap<String, serde_json::Value>,
    /// Disables backend-event predicates and enables LLM-judge predicates.
    #[serde(default)]
    pub is_real_web: bool,
    /// Viewport used by the random-clicker baseline agent.
    #[serde(default = "default_viewport")]
    pub screen_width: u32,
    #[serde(default = "default_viewport_height")]
    pub screen_height: u32,
}

fn default_viewport() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

impl Task {
    /// Predicates that actually contribute to this task's matrix, given
    /// `is_real_web`. A predicate whose family is disabled is excluded
    /// entirely — it must not appear in the denominator.
    pub fn active_predicates(&self) -> Vec<&Predicate> {
        self.predicates
            .iter()
            .filter(|p| {
                if self.is_real_web {
                    p.family() != crate::predicate::PredicateFamily::Backend
                } else {
                    true
                }
            })
            .collect()
    }
}
