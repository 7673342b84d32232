//! The orchestrator's external collaborators: task generation/loading and
//! the per-project backend it drives actions against. Both are out of
//! scope for this crate's own logic (spec.md §1, "task generation... is
//! an external collaborator") — they're supplied by the caller.

use async_trait::async_trait;
use bench_backend::BackendService;
use bench_types::{ProjectId, Task};

use crate::errors::OrchestratorError;

/// Loads (or generates) the task set for one project. `use_cached` mirrors
/// `BenchmarkConfig::use_cached_tasks`; implementations decide what
/// "cached" means (a `TaskCache`, a static fixture set, a remote service).
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn load_tasks(&self, project: &ProjectId, use_cached: bool) -> Result<Vec<Task>, OrchestratorError>;
}

/// Resolves a project id to the `BackendService` the evaluator should
/// isolate and query against. Kept separate from `TaskSource` because a
/// deployment may source tasks from one place and backends from another.
pub trait ProjectBackends: Send + Sync {
    fn backend_for(&self, project: &ProjectId) -> Option<std::sync::Arc<dyn BackendService>>;
}
