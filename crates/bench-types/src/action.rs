//! The action model: a closed, tagged-variant set of browser operations.

use serde::{Deserialize, Serialize};

use crate::ids::WEB_AGENT_ID_PLACEHOLDER;

/// A way of locating an element in the DOM.
///
/// Selectors are a sum type; the executor is polymorphic over them. A
/// selector that fails to resolve is a non-fatal execution error attached
/// to the step's result, not a panic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Selector {
    XPath { expr: String },
    Css { expr: String },
    AttributeValue { attr: String, value: String },
}

impl Selector {
    /// Stable string form used for logging and for fingerprinting.
    pub fn canonical(&self) -> String {
        match self {
            Selector::XPath { expr } => format!("xpath:{expr}"),
            Selector::Css { expr } => format!("css:{expr}"),
            Selector::AttributeValue { attr, value } => format!("attr:{attr}={value}"),
        }
    }
}

/// One discrete browser operation.
///
/// Actions are immutable value objects. A task carries the placeholder
/// token `<web_agent_id>` in action fields (typically inside `text` or a
/// `Selector::AttributeValue` value); the evaluator substitutes the
/// concrete agent identifier exactly once, immediately before dispatching
/// the action to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    Navigate { url: String },
    Click { selector: Selector },
    Type { selector: Selector, text: String },
    SendKeys { keys: String },
    Scroll { dx: i32, dy: i32 },
    Select { selector: Selector, value: String },
    Wait { duration_ms: u64 },
}

impl Action {
    /// Substitute every occurrence of the `<web_agent_id>` placeholder in
    /// this action's string fields with `agent_id`. Idempotent: an action
    /// already substituted is returned unchanged, since the placeholder
    /// no longer appears in it.
    pub fn substitute_agent_id(&self, agent_id: &str) -> Action {
        let sub = |s: &str| s.replace(WEB_AGENT_ID_PLACEHOLDER, agent_id);
        let sub_selector = |sel: &Selector| -> Selector {
            match sel {
                Selector::XPath { expr } => Selector::XPath { expr: sub(expr) },
                Selector::Css { expr } => Selector::Css { expr: sub(expr) },
                Selector::AttributeValue { attr, value } => Selector::AttributeValue {
                    attr: sub(attr),
                    value: sub(value),
                },
            }
        };
        match self {
            Action::Navigate { url } => Action::Navigate { url: sub(url) },
            Action::Click { selector } => Action::Click {
                selector: sub_selector(selector),
            },
            Action::Type { selector, text } => Action::Type {
                selector: sub_selector(selector),
                text: sub(text),
            },
            Action::SendKeys { keys } => Action::SendKeys { keys: sub(keys) },
            Action::Scroll { dx, dy } => Action::Scroll { dx: *dx, dy: *dy },
            Action::Select { selector, value } => Action::Select {
                selector: sub_selector(selector),
                value: sub(value),
            },
            Action::Wait { duration_ms } => Action::Wait {
                duration_ms: *duration_ms,
            },
        }
    }

    /// Canonical JSON form used to build the solution fingerprint. This is
    /// the tagged-variant serialization, not a human-readable summary.
    pub fn canonical_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_is_idempotent() {
        let action = Action::Type {
            selector: Selector::Css {
                expr: "#box".into(),
            },
            text: format!("hello {WEB_AGENT_ID_PLACEHOLDER}"),
        };
        let once = action.substitute_agent_id("agent-7");
        let twice = once.substitute_agent_id("agent-7");
        assert_eq!(once, twice);
        if let Action::Type { text, .. } = once {
            assert_eq!(text, "hello agent-7");
        } else {
            panic!("expected Type action");
        }
    }

    #[test]
    fn navigate_canonical_json_round_trips() {
        let action = Action::Navigate {
            url: "http://x/home".into(),
        };
        let json = action.canonical_json();
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(action, back);
    }
}
