//! The predicate model: the algebra of testable properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ConstructionError;

/// Which side of the isolation boundary a predicate depends on.
///
/// `is_real_web=true` on a [`crate::Task`] suppresses the `Backend` family
/// entirely: such predicates are excluded from the step×predicate matrix
/// and must not contribute to the denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateFamily {
    Frontend,
    Backend,
}

/// A single comparison operator usable in a [`Criterion`].
///
/// `greater_than`/`less_than`/`greater_equal`/`less_equal` compare numeric
/// JSON values; any other combination fails closed (returns `false`)
/// rather than erroring, matching the "unknown operator fails closed"
/// rule for criteria evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    InList,
    NotInList,
}

impl Default for CriteriaOp {
    fn default() -> Self {
        CriteriaOp::Equals
    }
}

/// One entry of a `BackendEvent` criteria tree: `field -> {operator, value}`.
///
/// Criteria form a flat map; there are no nested value objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default)]
    pub operator: CriteriaOp,
    pub value: serde_json::Value,
}

/// A boolean-valued checker applied to a [`crate::Snapshot`].
///
/// Each predicate kind implements evaluation over a snapshot plus context
/// (the full history and the predicate's position) without caring about
/// any other kind's semantics. Evaluation itself lives in the predicates
/// crate; this type only carries the closed, tagged-variant shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Predicate {
    UrlReached {
        expected: String,
    },
    HtmlContains {
        keywords: Vec<String>,
    },
    BackendEvent {
        name: String,
        #[serde(default)]
        criteria: BTreeMap<String, Criterion>,
    },
    PageViewEvent {
        url_substring: String,
    },
    HtmlJudge {
        success_criteria: String,
    },
    ScreenshotJudge {
        success_criteria: String,
    },
}

impl Predicate {
    /// Construct a `HtmlContains` predicate, trimming keywords and
    /// rejecting an empty set as a construction error rather than
    /// silently accepting an always-false predicate.
    pub fn html_contains(keywords: Vec<String>) -> Result<Predicate, ConstructionError> {
        let trimmed: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if trimmed.is_empty() {
            return Err(ConstructionError::EmptyKeywordSet);
        }
        Ok(Predicate::HtmlContains { keywords: trimmed })
    }

    /// Which family this predicate belongs to, used to decide whether
    /// `is_real_web` suppresses it.
    pub fn family(&self) -> PredicateFamily {
        match self {
            Predicate::BackendEvent { .. } | Predicate::PageViewEvent { .. } => {
                PredicateFamily::Backend
            }
            Predicate::UrlReached { .. }
            | Predicate::HtmlContains { .. }
            | Predicate::HtmlJudge { .. }
            | Predicate::ScreenshotJudge { .. } => PredicateFamily::Frontend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_contains_rejects_empty_keyword_set() {
        let err = Predicate::html_contains(vec!["  ".into(), "".into()]).unwrap_err();
        assert!(matches!(err, ConstructionError::EmptyKeywordSet));
    }

    #[test]
    fn backend_event_is_backend_family() {
        let p = Predicate::BackendEvent {
            name: "login".into(),
            criteria: BTreeMap::new(),
        };
        assert_eq!(p.family(), PredicateFamily::Backend);
    }

    #[test]
    fn page_view_event_is_backend_family() {
        let p = Predicate::PageViewEvent {
            url_substring: "/dashboard".into(),
        };
        assert_eq!(p.family(), PredicateFamily::Backend);
    }
}
