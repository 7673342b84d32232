//! `BackendService`: the interface the core uses to isolate and query a
//! target web application's backend event log.

use async_trait::async_trait;
use bench_types::BackendEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned an unparseable response: {0}")]
    InvalidResponse(String),
}

/// Reset and event-delta queries against one project's backend.
///
/// `reset` isolates bookkeeping before a `(task, agent, attempt)` runs;
/// `events_since` returns the delta attributable to that attempt via the
/// `X-WebAgent-Id` header the executor sets on every outgoing request.
/// A transport failure here is non-fatal to the step that triggered it —
/// callers treat an empty delta the same as "backend unreachable" and let
/// backend predicates for that step fail rather than aborting the run.
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn reset(&self, agent_id: &str) -> Result<(), BackendError>;
    async fn events_since(
        &self,
        agent_id: &str,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<BackendEvent>, BackendError>;
}

/// A backend that never emits events. Used for `is_real_web` tasks and
/// for tests that don't exercise backend predicates.
pub struct NullBackendService;

#[async_trait]
impl BackendService for NullBackendService {
    async fn reset(&self, _agent_id: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn events_since(
        &self,
        _agent_id: &str,
        _since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<BackendEvent>, BackendError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_backend_resets_cleanly_and_reports_no_events() {
        let backend = NullBackendService;
        assert!(backend.reset("agent-1").await.is_ok());
        let events = backend.events_since("agent-1", None).await.unwrap();
        assert!(events.is_empty());
    }
}
