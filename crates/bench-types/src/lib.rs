//! Shared data model for the web-agent benchmark core: the tagged-variant
//! Action/Selector/Predicate algebra, the Task/Snapshot/Solution value
//! objects, and the error taxonomy every other crate in the workspace
//! builds on.

pub mod action;
pub mod errors;
pub mod ids;
pub mod predicate;
pub mod snapshot;
pub mod solution;
pub mod task;

pub use action::{Action, Selector};
pub use errors::{ConstructionError, ErrorKind, StepError};
pub use ids::{AgentId, ProjectId, TaskId, WEB_AGENT_ID_PLACEHOLDER};
pub use predicate::{CriteriaOp, Criterion, Predicate, PredicateFamily};
pub use snapshot::{
    ActionResult, BackendEvent, EvaluationResult, Feedback, PhaseTimings, Snapshot, TestResult,
    TestResultsMatrix,
};
pub use solution::{fingerprint, TaskSolution};
pub use task::Task;
