//! HTTP-backed [`BackendService`] matching the contract in `DELETE
//! /events/{agent_id}` (reset) and `GET /events/{agent_id}?since=...`
//! (delta).

use async_trait::async_trait;
use bench_types::BackendEvent;
use tracing::{debug, warn};

use crate::service::{BackendError, BackendService};

pub struct HttpBackendService {
    client: reqwest::Client,
    base_url: String,
    timeout: std::time::Duration,
}

impl HttpBackendService {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[derive(serde::Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<BackendEvent>,
}

#[async_trait]
impl BackendService for HttpBackendService {
    async fn reset(&self, agent_id: &str) -> Result<(), BackendError> {
        let url = format!("{}/events/{}", self.base_url, agent_id);
        debug!(agent_id, url = %url, "resetting backend event log");
        let resp = tokio::time::timeout(self.timeout, self.client.delete(&url).send())
            .await
            .map_err(|_| BackendError::Transport("reset timed out".to_string()))?
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            warn!(agent_id, status = %resp.status(), "backend reset returned non-success");
        }
        Ok(())
    }

    async fn events_since(
        &self,
        agent_id: &str,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<BackendEvent>, BackendError> {
        let mut url = format!("{}/events/{}", self.base_url, agent_id);
        if let Some(ts) = since {
            url.push_str(&format!("?since={}", ts.timestamp_millis()));
        }
        let resp = tokio::time::timeout(self.timeout, self.client.get(&url).send())
            .await
            .map_err(|_| BackendError::Transport("events_since timed out".to_string()))?
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let body: EventsResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(body.events)
    }
}
