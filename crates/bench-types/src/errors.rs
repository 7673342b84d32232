//! Error taxonomy shared by every stage of the evaluation pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of a step-level failure.
///
/// This is the taxonomy carried on [`crate::ActionResult::error`], not a
/// Rust error type in its own right — it is what downstream scoring and
/// rollups switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Selector did not resolve to an element. Non-fatal: the step is
    /// recorded and execution continues.
    SelectorNotFound,
    /// Action exceeded its deadline. Fatal to the current solution.
    Timeout,
    /// Navigation failed outright. Scored identically to `Timeout`.
    Navigation,
    /// Backend service was unreachable for this step.
    Backend,
    /// The agent transport (HTTP call to `solve_task`/`act`) failed.
    AgentTransport,
    /// Unexpected invariant violation.
    Internal,
}

impl ErrorKind {
    /// Whether this error ends the remaining actions of the current solution.
    pub fn is_fatal_to_solution(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Navigation | ErrorKind::Internal)
    }
}

/// A step-level error attached to an [`crate::ActionResult`].
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{kind:?}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Construction-time validation failure for an immutable value object
/// (`Predicate`, `Task`, `BenchmarkConfig`, ...). These are always fatal
/// and surface directly to the caller, never swallowed.
#[derive(Debug, Clone, Error)]
pub enum ConstructionError {
    #[error("empty keyword set for HtmlContains predicate")]
    EmptyKeywordSet,
    #[error("invalid benchmark config: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Other(String),
}
