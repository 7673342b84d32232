//! BrowserExecutor: drives a single browser session bound to one agent,
//! turning one [`Action`] at a time into an [`ActionResult`].

use std::sync::Arc;
use std::time::Duration;

use bench_backend::BackendService;
use bench_types::{Action, ActionResult, ErrorKind, Snapshot, StepError};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::driver::{BrowserContext, BrowserDriver, DriverError};

/// Per-instance tuning; defaults match the spec's stated defaults.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub action_timeout: Duration,
    pub inter_action_delay: Duration,
    pub capture_screenshots: bool,
    /// When true, a step whose URL differs from the previous step's
    /// synthesizes a `page_view` backend event carrying the new URL, so
    /// `PageViewEvent` predicates still fire against target apps that
    /// never emit their own page-view events. Grounded on the original
    /// evaluator's always-on frame-navigation monitor.
    pub monitor_navigation: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(10),
            inter_action_delay: Duration::from_millis(200),
            capture_screenshots: false,
            monitor_navigation: true,
        }
    }
}

const SYNTHETIC_PAGE_VIEW_EVENT_TYPE: &str = "page_view";

/// Owns one browser context bound to one `agent_id`. Never panics or
/// propagates an error out of `execute`: every failure becomes
/// `ActionResult.error` with a best-effort `Snapshot` still attached.
pub struct BrowserExecutor {
    driver: Arc<dyn BrowserDriver>,
    backend: Arc<dyn BackendService>,
    ctx: BrowserContext,
    agent_id: String,
    config: ExecutorConfig,
    prev_html: String,
    prev_url: Option<String>,
    last_events_at: Option<chrono::DateTime<Utc>>,
    closed: bool,
}

impl BrowserExecutor {
    pub async fn open(
        driver: Arc<dyn BrowserDriver>,
        backend: Arc<dyn BackendService>,
        agent_id: impl Into<String>,
        config: ExecutorConfig,
    ) -> Result<Self, DriverError> {
        let agent_id = agent_id.into();
        let ctx = driver.open_context(&agent_id).await?;
        Ok(Self {
            driver,
            backend,
            ctx,
            agent_id,
            config,
            prev_html: String::new(),
            prev_url: None,
            last_events_at: None,
            closed: false,
        })
    }

    /// Execute one action and produce its Snapshot/ActionResult. Never
    /// returns `Err`: all failures are folded into `ActionResult.error`.
    pub async fn execute(&mut self, action: Action, step_index: usize) -> ActionResult {
        let start = std::time::Instant::now();

        let screenshot_before = if self.config.capture_screenshots {
            self.driver.screenshot(&self.ctx).await.ok()
        } else {
            None
        };

        let dispatch_result = tokio::time::timeout(
            self.config.action_timeout,
            self.dispatch(&action),
        )
        .await;

        let error = match dispatch_result {
            Ok(Ok(())) => None,
            Ok(Err(driver_err)) => Some(classify(driver_err)),
            Err(_elapsed) => Some(StepError::new(
                ErrorKind::Timeout,
                format!("action {action:?} exceeded {:?}", self.config.action_timeout),
            )),
        };

        let screenshot_after = if self.config.capture_screenshots {
            self.driver.screenshot(&self.ctx).await.ok()
        } else {
            None
        };

        let current_url = self
            .driver
            .current_url(&self.ctx)
            .await
            .unwrap_or_default();
        let current_html = self
            .driver
            .current_html(&self.ctx)
            .await
            .unwrap_or_else(|_| self.prev_html.clone());

        let now = Utc::now();
        let mut backend_events = match self.backend.events_since(&self.agent_id, self.last_events_at).await {
            Ok(events) => events,
            Err(err) => {
                warn!(agent_id = %self.agent_id, "backend events_since failed: {}", err);
                Vec::new()
            }
        };
        self.last_events_at = Some(now);

        if self.config.monitor_navigation {
            let navigated = self
                .prev_url
                .as_ref()
                .map(|prev| prev != &current_url)
                .unwrap_or(true);
            if navigated {
                let mut data = serde_json::Map::new();
                data.insert("url".to_string(), serde_json::Value::String(current_url.clone()));
                backend_events.push(bench_types::BackendEvent {
                    event_type: SYNTHETIC_PAGE_VIEW_EVENT_TYPE.to_string(),
                    data,
                    timestamp: now,
                });
            }
        }
        self.prev_url = Some(current_url.clone());

        let snapshot = Snapshot {
            iteration: step_index,
            current_url,
            current_html: current_html.clone(),
            prev_html: std::mem::replace(&mut self.prev_html, current_html),
            backend_events,
            screenshot_before,
            screenshot_after,
            action,
            timestamp: now,
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            step_index,
            ok = error.is_none(),
            latency_ms = execution_time_ms,
            "executed action"
        );

        if self.config.inter_action_delay > Duration::ZERO {
            tokio::time::sleep(self.config.inter_action_delay).await;
        }

        ActionResult {
            browser_snapshot: snapshot,
            successfully_executed: error.is_none(),
            execution_time_ms,
            error,
        }
    }

    async fn dispatch(&self, action: &Action) -> Result<(), DriverError> {
        match action {
            Action::Navigate { url } => self.driver.navigate(&self.ctx, url).await,
            Action::Click { selector } => self.driver.click(&self.ctx, selector).await,
            Action::Type { selector, text } => self.driver.type_text(&self.ctx, selector, text).await,
            Action::SendKeys { keys } => self.driver.send_keys(&self.ctx, keys).await,
            Action::Scroll { dx, dy } => self.driver.scroll(&self.ctx, *dx, *dy).await,
            Action::Select { selector, value } => self.driver.select(&self.ctx, selector, value).await,
            Action::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                Ok(())
            }
        }
    }

    /// Release the browser context. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.driver.close_context(&self.ctx).await {
            warn!("failed to close browser context cleanly: {}", err);
        }
        self.closed = true;
        debug!(context_id = %self.ctx.id, "browser executor closed");
    }
}

impl Drop for BrowserExecutor {
    fn drop(&mut self) {
        if !self.closed {
            warn!(context_id = %self.ctx.id, "BrowserExecutor dropped without close(); context may leak");
        }
    }
}

fn classify(err: DriverError) -> StepError {
    match err {
        DriverError::SelectorNotFound(msg) => StepError::new(ErrorKind::SelectorNotFound, msg),
        DriverError::NavTimeout(msg) => StepError::new(ErrorKind::Timeout, msg),
        DriverError::Navigation(msg) => StepError::new(ErrorKind::Navigation, msg),
        DriverError::Io(msg) => StepError::new(ErrorKind::Internal, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedDriver;
    use bench_backend::NullBackendService;
    use bench_types::Selector;

    async fn executor(start_url: &str) -> (BrowserExecutor, Arc<ScriptedDriver>) {
        let driver = Arc::new(ScriptedDriver::new(start_url));
        let executor = BrowserExecutor::open(
            driver.clone(),
            Arc::new(NullBackendService),
            "agent-1",
            ExecutorConfig {
                inter_action_delay: Duration::ZERO,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (executor, driver)
    }

    #[tokio::test]
    async fn navigate_updates_url_and_prev_html_chains() {
        let (mut exec, driver) = executor("http://x/").await;
        driver.push_transition("http://x/home", "<html>home</html>");
        let result = exec
            .execute(
                Action::Navigate {
                    url: "http://x/home".into(),
                },
                0,
            )
            .await;
        assert!(result.successfully_executed);
        assert_eq!(result.browser_snapshot.iteration, 0);
        assert_eq!(result.browser_snapshot.current_url, "http://x/home");
        assert_eq!(result.browser_snapshot.prev_html, "");

        driver.push_transition("http://x/home", "<html>home v2</html>");
        let second = exec
            .execute(Action::Scroll { dx: 0, dy: 100 }, 1)
            .await;
        assert_eq!(second.browser_snapshot.prev_html, "<html>home</html>");
        exec.close().await;
    }

    #[tokio::test]
    async fn selector_not_found_is_non_fatal_and_continues() {
        let (mut exec, driver) = executor("http://x/").await;
        let selector = Selector::Css {
            expr: "#missing".into(),
        };
        driver.fail_selector(&selector);
        let result = exec.execute(Action::Click { selector }, 0).await;
        assert!(!result.successfully_executed);
        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::SelectorNotFound);
        exec.close().await;
    }

    #[tokio::test]
    async fn navigation_monitor_synthesizes_page_view_event_on_url_change() {
        let (mut exec, driver) = executor("http://x/").await;
        driver.push_transition("http://x/home", "<html>home</html>");
        let first = exec
            .execute(Action::Navigate { url: "http://x/home".into() }, 0)
            .await;
        assert!(first
            .browser_snapshot
            .backend_events
            .iter()
            .any(|e| e.event_type == "page_view" && e.data.get("url").and_then(|v| v.as_str()) == Some("http://x/home")));

        driver.push_transition("http://x/home", "<html>home v2</html>");
        let second = exec.execute(Action::Scroll { dx: 0, dy: 1 }, 1).await;
        assert!(
            second.browser_snapshot.backend_events.is_empty(),
            "no url change, no synthetic event"
        );
        exec.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut exec, _driver) = executor("http://x/").await;
        exec.close().await;
        exec.close().await;
    }
}
