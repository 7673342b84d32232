//! Concrete `TaskSource`: a per-project `TaskCache` fronting a `/tasks`
//! fetch against that project's backend, the same demo-webs convention
//! `HttpBackendService` already assumes for `/events/{agent_id}`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bench_cache::TaskCache;
use bench_orchestrator::{OrchestratorError, TaskSource};
use bench_types::{ProjectId, Task};
use tracing::{info, warn};

const TASK_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTaskSource {
    cache_dir: PathBuf,
    project_urls: BTreeMap<ProjectId, String>,
    client: reqwest::Client,
}

impl HttpTaskSource {
    pub fn new(cache_dir: PathBuf, project_urls: BTreeMap<ProjectId, String>) -> Self {
        Self {
            cache_dir,
            project_urls,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, base_url: &str) -> Result<Vec<Task>, OrchestratorError> {
        let url = format!("{base_url}/tasks");
        let resp = tokio::time::timeout(TASK_FETCH_TIMEOUT, self.client.get(&url).send())
            .await
            .map_err(|e| OrchestratorError::TaskSource {
                project: base_url.to_string(),
                source: Box::new(e),
            })?
            .map_err(|e| OrchestratorError::TaskSource {
                project: base_url.to_string(),
                source: Box::new(e),
            })?;
        resp.json::<Vec<Task>>()
            .await
            .map_err(|e| OrchestratorError::TaskSource {
                project: base_url.to_string(),
                source: Box::new(e),
            })
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn load_tasks(&self, project: &ProjectId, use_cached: bool) -> Result<Vec<Task>, OrchestratorError> {
        let cache = TaskCache::open(&self.cache_dir, project.as_str()).await;
        if use_cached {
            let cached = cache.get_all().await;
            if !cached.is_empty() {
                info!(project = %project, count = cached.len(), "using cached tasks");
                return Ok(cached);
            }
        }

        let base_url = self
            .project_urls
            .get(project)
            .ok_or_else(|| OrchestratorError::TaskSource {
                project: project.as_str().to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no backend_url configured for this project",
                )),
            })?;

        let tasks = self.fetch(base_url).await?;
        if let Err(err) = cache.replace_all(tasks.clone()).await {
            warn!(project = %project, "failed to persist fetched tasks to cache: {}", err);
        }
        Ok(tasks)
    }
}
