//! HTTP transport for remote agents (spec §6: one-shot `/solve_task`,
//! iterative `/act` with `/step` fallback).

use std::time::Duration;

use async_trait::async_trait;
use bench_types::{Action, ActionResult, Task, TaskSolution};
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::errors::AgentError;
use crate::model::{parse_actions_lenient, ActRequest, ActResponse, AgentState, SolveTaskRequest, SolveTaskResponse};
use crate::rewrite::UrlRewriter;

pub struct HttpAgentClient {
    agent_id: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    rewriter: UrlRewriter,
}

impl HttpAgentClient {
    pub fn new(
        agent_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        rewriter: UrlRewriter,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            timeout,
            rewriter,
        }
    }

    async fn post_json<T: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, AgentError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = tokio::time::timeout(self.timeout, self.client.post(&url).json(body).send())
            .await
            .map_err(|_| AgentError::Timeout(self.timeout))?
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        resp.json::<R>()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Agent for HttpAgentClient {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn solve_task(&self, task: &Task) -> Result<TaskSolution, AgentError> {
        let local_url = self.rewriter.to_local(&task.start_url);
        let request = SolveTaskRequest {
            task_id: task.id.as_str(),
            prompt: &task.prompt,
            url: &local_url,
            web_project_id: task.project_id.as_str(),
            relevant_data: task.relevant_data.clone(),
        };
        debug!(agent_id = %self.agent_id, task_id = %task.id, "calling solve_task");
        let response: SolveTaskResponse = self.post_json("/solve_task", &request).await?;
        let actions = self
            .rewriter
            .rewrite_actions_to_remote(parse_actions_lenient(response.actions));
        Ok(TaskSolution {
            task_id: task.id.clone(),
            web_agent_id: self.agent_id.clone().into(),
            actions,
            recording: None,
        })
    }

    async fn act(&self, state: &AgentState, history: &[ActionResult]) -> Result<Vec<Action>, AgentError> {
        let local_url = self.rewriter.to_local(&state.url);
        let request = ActRequest {
            task_id: state.task_id.as_str(),
            prompt: &state.prompt,
            url: &local_url,
            snapshot_html: &state.snapshot_html,
            screenshot: state.screenshot.as_deref(),
            step_index: state.step_index,
            history,
        };
        let response: Result<ActResponse, AgentError> = self.post_json("/act", &request).await;
        let response = match response {
            Ok(r) => r,
            Err(_) => {
                warn!(agent_id = %self.agent_id, "/act failed, falling back to /step");
                self.post_json("/step", &request).await?
            }
        };
        Ok(self.rewriter.rewrite_actions_to_remote(response.into_actions()))
    }
}

