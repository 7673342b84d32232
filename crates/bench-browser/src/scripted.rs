//! Deterministic [`BrowserDriver`] test double: replays a fixed queue of
//! DOM/URL transitions instead of driving a real Chromium instance.
//! Mirrors the role `cdp-adapter`'s `NoopTransport` plays for its `Cdp`
//! trait — a stand-in that lets the layer above be tested without a
//! browser.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bench_types::Selector;

use crate::driver::{BrowserContext, BrowserDriver, DriverError};

#[derive(Default)]
struct State {
    url: String,
    html: String,
    transitions: VecDeque<(String, String)>,
    unresolvable: HashSet<String>,
}

/// A scripted browser: each interacting call (navigate/click/type/select/
/// scroll/send_keys) advances to the next queued `(url, html)` pair, or
/// holds its current state if the queue is exhausted. Selectors whose
/// canonical form is registered via [`ScriptedDriver::fail_selector`]
/// always resolve as not-found.
pub struct ScriptedDriver {
    state: Mutex<State>,
}

impl ScriptedDriver {
    pub fn new(start_url: &str) -> Self {
        Self {
            state: Mutex::new(State {
                url: start_url.to_string(),
                html: String::new(),
                transitions: VecDeque::new(),
                unresolvable: HashSet::new(),
            }),
        }
    }

    /// Queue the `(url, html)` the browser will report after the Nth
    /// interacting call from now on.
    pub fn push_transition(&self, url: &str, html: &str) {
        self.state
            .lock()
            .unwrap()
            .transitions
            .push_back((url.to_string(), html.to_string()));
    }

    pub fn fail_selector(&self, selector: &Selector) {
        self.state
            .lock()
            .unwrap()
            .unresolvable
            .insert(selector.canonical());
    }

    fn advance(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some((url, html)) = state.transitions.pop_front() {
            state.url = url;
            state.html = html;
        }
    }

    fn check_selector(&self, selector: &Selector) -> Result<(), DriverError> {
        let state = self.state.lock().unwrap();
        if state.unresolvable.contains(&selector.canonical()) {
            return Err(DriverError::SelectorNotFound(selector.canonical()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn open_context(&self, agent_header: &str) -> Result<BrowserContext, DriverError> {
        Ok(BrowserContext {
            id: "scripted".to_string(),
            agent_header: agent_header.to_string(),
        })
    }

    async fn close_context(&self, _ctx: &BrowserContext) -> Result<(), DriverError> {
        Ok(())
    }

    async fn navigate(&self, _ctx: &BrowserContext, url: &str) -> Result<(), DriverError> {
        self.advance();
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn click(&self, _ctx: &BrowserContext, selector: &Selector) -> Result<(), DriverError> {
        self.check_selector(selector)?;
        self.advance();
        Ok(())
    }

    async fn type_text(
        &self,
        _ctx: &BrowserContext,
        selector: &Selector,
        _text: &str,
    ) -> Result<(), DriverError> {
        self.check_selector(selector)?;
        self.advance();
        Ok(())
    }

    async fn send_keys(&self, _ctx: &BrowserContext, _keys: &str) -> Result<(), DriverError> {
        self.advance();
        Ok(())
    }

    async fn scroll(&self, _ctx: &BrowserContext, _dx: i32, _dy: i32) -> Result<(), DriverError> {
        self.advance();
        Ok(())
    }

    async fn select(
        &self,
        _ctx: &BrowserContext,
        selector: &Selector,
        _value: &str,
    ) -> Result<(), DriverError> {
        self.check_selector(selector)?;
        self.advance();
        Ok(())
    }

    async fn current_url(&self, _ctx: &BrowserContext) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn current_html(&self, _ctx: &BrowserContext) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().html.clone())
    }

    async fn screenshot(&self, _ctx: &BrowserContext) -> Result<String, DriverError> {
        Ok(String::new())
    }
}
