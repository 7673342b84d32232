//! Process-wide, read-mostly cache of the random-clicker baseline score
//! per task, populated by a compare-and-swap / single-flight dedup so
//! concurrent evaluations of the same task don't each pay for their own
//! baseline run.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct BaselineCache {
    slots: DashMap<String, Arc<AsyncMutex<Option<f64>>>>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Returns the cached baseline for `task_id`, computing it via
    /// `compute` on first access. Concurrent callers for the same task
    /// share one in-flight computation rather than racing duplicate
    /// random-clicker runs.
    pub async fn get_or_compute<F, Fut>(&self, task_id: &str, compute: F) -> f64
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = f64>,
    {
        let slot = self
            .slots
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone();
        let mut guard = slot.lock().await;
        if let Some(value) = *guard {
            return value;
        }
        let value = compute().await;
        *guard = Some(value);
        value
    }
}
