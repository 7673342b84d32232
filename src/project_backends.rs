//! Maps each configured project to the `HttpBackendService` fronting its
//! target web application's event log.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bench_backend::{BackendService, HttpBackendService};
use bench_orchestrator::ProjectBackends;
use bench_types::ProjectId;

use crate::config::ProjectEntry;

const BACKEND_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ProjectBackendRegistry {
    backends: BTreeMap<ProjectId, Arc<dyn BackendService>>,
}

impl ProjectBackendRegistry {
    pub fn new(entries: &[ProjectEntry]) -> Self {
        let backends = entries
            .iter()
            .map(|p| {
                let id = ProjectId::from(p.id.as_str());
                let backend: Arc<dyn BackendService> =
                    Arc::new(HttpBackendService::new(p.backend_url.clone(), BACKEND_CALL_TIMEOUT));
                (id, backend)
            })
            .collect();
        Self { backends }
    }
}

impl ProjectBackends for ProjectBackendRegistry {
    fn backend_for(&self, project: &ProjectId) -> Option<Arc<dyn BackendService>> {
        self.backends.get(project).cloned()
    }
}
