//! Real [`BrowserDriver`] over a headless Chromium instance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bench_types::Selector;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{BrowserContext, BrowserDriver, DriverError};
use crate::locator::probe_script;

/// Launches and owns one headless Chromium process, handing out isolated
/// pages (one per `open_context`) keyed by context id.
pub struct ChromeDriver {
    browser: Arc<Browser>,
    _handler: JoinHandle<()>,
    pages: DashMap<String, chromiumoxide::Page>,
    action_timeout: Duration,
}

impl ChromeDriver {
    pub async fn launch(headless: bool, action_timeout: Duration) -> Result<Self, DriverError> {
        let config = BrowserConfig::builder()
            .with_head()
            .build()
            .map_err(|e| DriverError::Io(e.to_string()))?;
        let config = if headless {
            BrowserConfig::builder()
                .build()
                .map_err(|e| DriverError::Io(e.to_string()))?
        } else {
            config
        };
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Io(format!("failed to launch chromium: {e}")))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = futures::StreamExt::next(&mut handler).await {
                if let Err(err) = event {
                    warn!("chromium event stream error: {}", err);
                }
            }
        });
        Ok(Self {
            browser: Arc::new(browser),
            _handler: handler_task,
            pages: DashMap::new(),
            action_timeout,
        })
    }

    fn page(&self, ctx: &BrowserContext) -> Result<chromiumoxide::Page, DriverError> {
        self.pages
            .get(&ctx.id)
            .map(|p| p.clone())
            .ok_or_else(|| DriverError::Io(format!("unknown browser context {}", ctx.id)))
    }

    async fn run_probe(
        &self,
        ctx: &BrowserContext,
        selector: &Selector,
        body: &str,
    ) -> Result<serde_json::Value, DriverError> {
        let page = self.page(ctx)?;
        let script = probe_script(selector, body);
        let value = tokio::time::timeout(self.action_timeout, page.evaluate(script))
            .await
            .map_err(|_| DriverError::NavTimeout("evaluate timed out".into()))?
            .map_err(|e| DriverError::Io(e.to_string()))?
            .into_value::<serde_json::Value>()
            .map_err(|e| DriverError::Io(e.to_string()))?;
        if !value.get("found").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(DriverError::SelectorNotFound(format!(
                "selector {} did not resolve",
                selector.canonical()
            )));
        }
        Ok(value)
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn open_context(&self, agent_header: &str) -> Result<BrowserContext, DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Io(e.to_string()))?;
        page.set_extra_http_headers([("X-WebAgent-Id".to_string(), agent_header.to_string())])
            .await
            .map_err(|e| DriverError::Io(e.to_string()))?;
        let id = uuid::Uuid::new_v4().to_string();
        info!(context_id = %id, agent = %agent_header, "opened browser context");
        self.pages.insert(id.clone(), page);
        Ok(BrowserContext {
            id,
            agent_header: agent_header.to_string(),
        })
    }

    async fn close_context(&self, ctx: &BrowserContext) -> Result<(), DriverError> {
        if let Some((_, page)) = self.pages.remove(&ctx.id) {
            if let Err(err) = page.close().await {
                warn!(context_id = %ctx.id, "failed to close page cleanly: {}", err);
            }
        }
        debug!(context_id = %ctx.id, "closed browser context");
        Ok(())
    }

    async fn navigate(&self, ctx: &BrowserContext, url: &str) -> Result<(), DriverError> {
        let page = self.page(ctx)?;
        tokio::time::timeout(self.action_timeout, page.goto(url))
            .await
            .map_err(|_| DriverError::NavTimeout(format!("navigate to {url} timed out")))?
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        tokio::time::timeout(self.action_timeout, page.wait_for_navigation())
            .await
            .map_err(|_| DriverError::NavTimeout(format!("load event for {url} timed out")))?
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn click(&self, ctx: &BrowserContext, selector: &Selector) -> Result<(), DriverError> {
        self.run_probe(
            ctx,
            selector,
            "el.dispatchEvent(new MouseEvent('click', {bubbles: true})); return {found: true};",
        )
        .await?;
        Ok(())
    }

    async fn type_text(
        &self,
        ctx: &BrowserContext,
        selector: &Selector,
        text: &str,
    ) -> Result<(), DriverError> {
        let text_json = serde_json::to_string(text).unwrap_or_else(|_| "''".to_string());
        let body = format!(
            "el.focus(); el.value = {text_json}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); return {{found: true}};"
        );
        self.run_probe(ctx, selector, &body).await?;
        Ok(())
    }

    async fn send_keys(&self, ctx: &BrowserContext, keys: &str) -> Result<(), DriverError> {
        let page = self.page(ctx)?;
        for ch in keys.chars() {
            page.type_str(ch.to_string())
                .await
                .map_err(|e| DriverError::Io(e.to_string()))?;
        }
        Ok(())
    }

    async fn scroll(&self, ctx: &BrowserContext, dx: i32, dy: i32) -> Result<(), DriverError> {
        let page = self.page(ctx)?;
        let script = format!("window.scrollBy({dx}, {dy}); return {{found: true}};");
        page.evaluate(script)
            .await
            .map_err(|e| DriverError::Io(e.to_string()))?;
        Ok(())
    }

    async fn select(
        &self,
        ctx: &BrowserContext,
        selector: &Selector,
        value: &str,
    ) -> Result<(), DriverError> {
        let value_json = serde_json::to_string(value).unwrap_or_else(|_| "''".to_string());
        let body = format!(
            "el.value = {value_json}; \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); return {{found: true}};"
        );
        self.run_probe(ctx, selector, &body).await?;
        Ok(())
    }

    async fn current_url(&self, ctx: &BrowserContext) -> Result<String, DriverError> {
        let page = self.page(ctx)?;
        page.url()
            .await
            .map_err(|e| DriverError::Io(e.to_string()))?
            .ok_or_else(|| DriverError::Io("page has no URL yet".into()))
    }

    async fn current_html(&self, ctx: &BrowserContext) -> Result<String, DriverError> {
        let page = self.page(ctx)?;
        page.content()
            .await
            .map_err(|e| DriverError::Io(e.to_string()))
    }

    async fn screenshot(&self, ctx: &BrowserContext) -> Result<String, DriverError> {
        let page = self.page(ctx)?;
        let bytes = page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(|e| DriverError::Io(e.to_string()))?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            bytes,
        ))
    }
}
