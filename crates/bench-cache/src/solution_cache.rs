//! Content-addressed persistence of `(task_id, agent_id) -> solution`.
//!
//! A single JSON file per cache directory, guarded by a per-process lock
//! (§5: "single-writer through a per-process lock; reads tolerate
//! transient inconsistency"). Atomic write: serialize to a temp file,
//! then rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bench_types::TaskSolution;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::CacheError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub agent_id: String,
    pub agent_name: String,
    /// Unix timestamp in seconds, matching the on-disk schema in spec §6.
    pub timestamp: f64,
    pub solution: TaskSolution,
}

type CacheMap = BTreeMap<String, BTreeMap<String, SolutionRecord>>;

struct State {
    path: PathBuf,
    map: CacheMap,
}

pub struct SolutionCache {
    state: Mutex<State>,
}

impl SolutionCache {
    /// Loads `<cache_dir>/solutions.json` if present. A corrupt file is
    /// non-fatal: it is logged and treated as an empty cache.
    pub async fn open(cache_dir: impl AsRef<Path>) -> Self {
        let path = cache_dir.as_ref().join("solutions.json");
        let map = load(&path).unwrap_or_else(|err| {
            warn!("solution cache unreadable, starting empty: {}", err);
            CacheMap::new()
        });
        Self {
            state: Mutex::new(State { path, map }),
        }
    }

    /// Lookup by `(task_id, agent_id)`. Presence alone does not imply
    /// freshness; callers decide whether to use it via their own
    /// `use_cached_solutions` policy.
    pub async fn get(&self, task_id: &str, agent_id: &str) -> Option<SolutionRecord> {
        let state = self.state.lock().await;
        state.map.get(task_id)?.get(agent_id).cloned()
    }

    pub async fn put(
        &self,
        task_id: &str,
        agent_id: &str,
        record: SolutionRecord,
    ) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state
            .map
            .entry(task_id.to_string())
            .or_default()
            .insert(agent_id.to_string(), record);
        let path = state.path.clone();
        let data = serde_json::to_vec_pretty(&state.map).map_err(|e| CacheError::Serde(e.to_string()))?;
        write_atomic(&path, &data)
    }
}

fn load(path: &Path) -> Result<CacheMap, CacheError> {
    if !path.exists() {
        return Ok(CacheMap::new());
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
    use bench_types::{AgentId, TaskId};

    #[tokio::test]
    async fn round_trips_a_solution() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SolutionCache::open(dir.path()).await;
        let solution = TaskSolution {
            task_id: TaskId::from("task-1"),
            web_agent_id: AgentId::from("agent-1"),
            actions: vec![],
            recording: None,
        };
        cache
            .put(
                "task-1",
                "agent-1",
                SolutionRecord {
                    agent_id: "agent-1".into(),
                    agent_name: "agent-1".into(),
                    timestamp: 1_690_000_000.0,
                    solution: solution.clone(),
                },
            )
            .await
            .unwrap();

        let reopened = SolutionCache::open(dir.path()).await;
        let record = reopened.get("task-1", "agent-1").await.unwrap();
        assert_eq!(record.solution.task_id, solution.task_id);
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("solutions.json"), b"not json").unwrap();
        let cache = SolutionCache::open(dir.path()).await;
        assert!(cache.get("anything", "anyone").await.is_none());
    }

    #[tokio::test]
    async fn missing_lookup_returns_none_without_implying_absence_forever() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SolutionCache::open(dir.path()).await;
        assert!(cache.get("task-x", "agent-x").await.is_none());
    }
}
