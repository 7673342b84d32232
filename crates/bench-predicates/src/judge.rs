//! LLM-judge delegate used by `HtmlJudge` / `ScreenshotJudge` predicates.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure from an LLM-judge call.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge transport error: {0}")]
    Network(String),
    #[error("judge returned an unparseable response: {0}")]
    InvalidResponse(String),
}

impl JudgeError {
    /// Only network errors are worth a single retry; a malformed response
    /// will not fix itself on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JudgeError::Network(_))
    }
}

/// Compares DOM or screenshot state before/after against free-text
/// success criteria and returns a boolean verdict.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge_html(
        &self,
        success_criteria: &str,
        html_before: &str,
        html_after: &str,
    ) -> Result<bool, JudgeError>;

    async fn judge_screenshot(
        &self,
        success_criteria: &str,
        screenshot_before: Option<&str>,
        screenshot_after: Option<&str>,
    ) -> Result<bool, JudgeError>;
}

/// A judge that always returns `false` without making a network call.
/// Used where no LLM backend is configured; the task's predicates still
/// evaluate instead of erroring.
pub struct NullJudge;

#[async_trait]
impl Judge for NullJudge {
    async fn judge_html(&self, _: &str, _: &str, _: &str) -> Result<bool, JudgeError> {
        Ok(false)
    }

    async fn judge_screenshot(&self, _: &str, _: Option<&str>, _: Option<&str>) -> Result<bool, JudgeError> {
        Ok(false)
    }
}

#[derive(Debug, Serialize)]
struct JudgeRequest<'a> {
    success_criteria: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_before: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_after: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_before: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_after: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
    success: bool,
}

/// Delegates `HtmlJudge`/`ScreenshotJudge` verdicts to a remote LLM-judge
/// service reached over a single `POST /judge` contract. Mirrors the
/// request/response round trip `HttpAgentClient` uses for `/solve_task`,
/// with its own error type since a bad verdict is a judge concern, not an
/// agent-transport one.
pub struct HttpJudge {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpJudge {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn call(&self, request: &JudgeRequest<'_>) -> Result<bool, JudgeError> {
        let url = format!("{}/judge", self.base_url);
        let resp = tokio::time::timeout(self.timeout, self.client.post(&url).json(request).send())
            .await
            .map_err(|_| JudgeError::Network(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| JudgeError::Network(e.to_string()))?;
        let body: JudgeResponse = resp
            .json()
            .await
            .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;
        Ok(body.success)
    }
}

#[async_trait]
impl Judge for HttpJudge {
    async fn judge_html(
        &self,
        success_criteria: &str,
        html_before: &str,
        html_after: &str,
    ) -> Result<bool, JudgeError> {
        self.call(&JudgeRequest {
            success_criteria,
            html_before: Some(html_before),
            html_after: Some(html_after),
            screenshot_before: None,
            screenshot_after: None,
        })
        .await
    }

    async fn judge_screenshot(
        &self,
        success_criteria: &str,
        screenshot_before: Option<&str>,
        screenshot_after: Option<&str>,
    ) -> Result<bool, JudgeError> {
        self.call(&JudgeRequest {
            success_criteria,
            html_before: None,
            html_after: None,
            screenshot_before,
            screenshot_after,
        })
        .await
    }
}

#[cfg(test)]
mod http_judge_tests {
    use super::*;

    #[test]
    fn base_url_has_no_trailing_slash_assumption() {
        let judge = HttpJudge::new("http://localhost:4000", Duration::from_secs(5));
        assert_eq!(judge.base_url, "http://localhost:4000");
    }
}
