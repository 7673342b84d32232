//! Per-project persistence of already-synthesized tasks. Task
//! *generation* is out of scope for this core; this cache only holds
//! what an upstream generator already produced, the same atomic-write
//! discipline as [`crate::SolutionCache`].

use std::path::{Path, PathBuf};

use bench_types::Task;
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::CacheError;

struct State {
    path: PathBuf,
    tasks: Vec<Task>,
}

pub struct TaskCache {
    state: Mutex<State>,
}

impl TaskCache {
    pub async fn open(cache_dir: impl AsRef<Path>, project_id: &str) -> Self {
        let path = cache_dir.as_ref().join(format!("tasks_{project_id}.json"));
        let tasks = load(&path).unwrap_or_else(|err| {
            warn!("task cache unreadable, starting empty: {}", err);
            Vec::new()
        });
        Self {
            state: Mutex::new(State { path, tasks }),
        }
    }

    pub async fn get_all(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn replace_all(&self, tasks: Vec<Task>) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state.tasks = tasks;
        let data = serde_json::to_vec_pretty(&state.tasks).map_err(|e| CacheError::Serde(e.to_string()))?;
        write_atomic(&state.path, &data)
    }
}

fn load(path: &Path) -> Result<Vec<Task>, CacheError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read(path).map_err(|e| CacheError::Io(e.to_string()))?;
    serde_json::from_slice(&data).map_err(|e| CacheError::Serde(e.to_string()))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::Io(e.to_string()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data).map_err(|e| CacheError::Io(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| CacheError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_types::{ProjectId, TaskId};
    use std::collections::BTreeMap;

    fn sample_task() -> Task {
        Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            prompt: "p".into(),
            start_url: "http://x/".into(),
            predicates: vec![],
            use_case: None,
            relevant_data: BTreeMap::new(),
            is_real_web: false,
            screen_width: 1280,
            screen_height: 800,
        }
    }

    #[tokio::test]
    async fn round_trips_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TaskCache::open(dir.path(), "proj-1").await;
        cache.replace_all(vec![sample_task()]).await.unwrap();
        let reopened = TaskCache::open(dir.path(), "proj-1").await;
        assert_eq!(reopened.get_all().await.len(), 1);
    }
}
