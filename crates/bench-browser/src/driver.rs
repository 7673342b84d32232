//! The `BrowserDriver` seam: one trait, a real Chrome implementation, and
//! a scripted test double, the same split `cdp-adapter`'s `Cdp` trait draws
//! between the real transport and its no-op stub.

use async_trait::async_trait;
use bench_types::Selector;
use thiserror::Error;

/// A resolved handle bound to one browser tab/context, opaque to callers.
#[derive(Debug, Clone)]
pub struct BrowserContext {
    pub id: String,
    /// Header value identifying the owning agent; injected on every
    /// request originating from this context so backend bookkeeping can
    /// attribute events.
    pub agent_header: String,
}

/// Failure classification from the driver layer. `BrowserExecutor` maps
/// these onto [`bench_types::ErrorKind`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation timed out: {0}")]
    NavTimeout(String),
    #[error("selector did not resolve: {0}")]
    SelectorNotFound(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("driver I/O error: {0}")]
    Io(String),
}

/// Drives one browser session. `BrowserExecutor` is the only caller;
/// implementations own the underlying transport (a real CDP connection,
/// or a scripted replay for tests).
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open_context(&self, agent_header: &str) -> Result<BrowserContext, DriverError>;
    async fn close_context(&self, ctx: &BrowserContext) -> Result<(), DriverError>;

    async fn navigate(&self, ctx: &BrowserContext, url: &str) -> Result<(), DriverError>;
    async fn click(&self, ctx: &BrowserContext, selector: &Selector) -> Result<(), DriverError>;
    async fn type_text(
        &self,
        ctx: &BrowserContext,
        selector: &Selector,
        text: &str,
    ) -> Result<(), DriverError>;
    async fn send_keys(&self, ctx: &BrowserContext, keys: &str) -> Result<(), DriverError>;
    async fn scroll(&self, ctx: &BrowserContext, dx: i32, dy: i32) -> Result<(), DriverError>;
    async fn select(
        &self,
        ctx: &BrowserContext,
        selector: &Selector,
        value: &str,
    ) -> Result<(), DriverError>;

    async fn current_url(&self, ctx: &BrowserContext) -> Result<String, DriverError>;
    async fn current_html(&self, ctx: &BrowserContext) -> Result<String, DriverError>;
    async fn screenshot(&self, ctx: &BrowserContext) -> Result<String, DriverError>;
}
