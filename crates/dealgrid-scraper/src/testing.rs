//! Scripted in-memory implementation of the automation traits for tests.
//!
//! Selectors are matched as exact strings against a per-page node map, so a
//! test registers nodes under the same selector strings the layouts use.
//! Script evaluation answers from a per-expression queue whose last value
//! repeats.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::browser::{Browser, BrowserError, Element, Page, Session};

pub(crate) type ClickHook = Arc<dyn Fn(&mut FakeState) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct FakeNode {
    pub text: String,
    pub html: String,
    pub attrs: HashMap<String, String>,
    pub children: HashMap<String, Vec<FakeNode>>,
    pub on_click: Option<ClickHook>,
}

impl FakeNode {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            html: format!("<span>{text}</span>"),
            ..Self::default()
        }
    }

    pub fn html(html: &str) -> Self {
        Self {
            text: html.to_string(),
            html: html.to_string(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, selector: &str, node: FakeNode) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(node);
        self
    }

    pub fn on_click(mut self, hook: impl Fn(&mut FakeState) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(hook));
        self
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeState {
    pub title: String,
    pub nodes: HashMap<String, Vec<FakeNode>>,
    pub evals: HashMap<String, VecDeque<serde_json::Value>>,
    pub scrolls: Vec<i64>,
    pub clicks: usize,
    pub load_error: Option<String>,
    pub navigation_fails: bool,
}

impl FakeState {
    pub fn with(mut self, selector: &str, node: FakeNode) -> Self {
        self.push(selector, node);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_eval(mut self, expression: &str, value: serde_json::Value) -> Self {
        self.evals
            .entry(expression.to_string())
            .or_default()
            .push_back(value);
        self
    }

    pub fn with_load_error(mut self, reason: &str) -> Self {
        self.load_error = Some(reason.to_string());
        self
    }

    pub fn push(&mut self, selector: &str, node: FakeNode) {
        self.nodes
            .entry(selector.to_string())
            .or_default()
            .push(node);
    }

    pub fn remove(&mut self, selector: &str) {
        self.nodes.remove(selector);
    }
}

#[derive(Clone)]
pub(crate) struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn scrolls(&self) -> Vec<i64> {
        self.state.lock().unwrap().scrolls.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }
}

pub(crate) struct FakeElement {
    node: FakeNode,
    state: Arc<Mutex<FakeState>>,
}

impl Page for FakePage {
    type Element = FakeElement;

    async fn wait_load(&self, _timeout: Duration) -> Result<(), BrowserError> {
        match &self.state.lock().unwrap().load_error {
            Some(reason) => Err(BrowserError::Timeout {
                what: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<FakeElement>, BrowserError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .get(selector)
            .and_then(|nodes| nodes.first())
            .map(|node| FakeElement {
                node: node.clone(),
                state: Arc::clone(&self.state),
            }))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeElement>, BrowserError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .get(selector)
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| FakeElement {
                        node: node.clone(),
                        state: Arc::clone(&self.state),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn wait_navigation(&self, _timeout: Duration) -> Result<(), BrowserError> {
        if self.state.lock().unwrap().navigation_fails {
            return Err(BrowserError::Timeout {
                what: "navigation".to_string(),
            });
        }
        Ok(())
    }

    async fn evaluate<T>(&self, expression: &str) -> Result<T, BrowserError>
    where
        T: DeserializeOwned + Send,
    {
        let value = {
            let mut state = self.state.lock().unwrap();
            let queue = state
                .evals
                .get_mut(expression)
                .ok_or_else(|| BrowserError::Script(format!("no scripted value for {expression}")))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };
        let value =
            value.ok_or_else(|| BrowserError::Script(format!("empty script queue: {expression}")))?;
        serde_json::from_value(value).map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), BrowserError> {
        self.state.lock().unwrap().scrolls.push(dy);
        Ok(())
    }

    async fn close(self) {}
}

impl Element for FakeElement {
    async fn text(&self) -> Result<String, BrowserError> {
        Ok(self.node.text.clone())
    }

    async fn html(&self) -> Result<String, BrowserError> {
        Ok(self.node.html.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.node.attrs.get(name).cloned())
    }

    async fn click(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.clicks += 1;
        if let Some(hook) = &self.node.on_click {
            hook(&mut state);
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<FakeElement>, BrowserError> {
        Ok(self
            .node
            .children
            .get(selector)
            .and_then(|nodes| nodes.first())
            .map(|node| FakeElement {
                node: node.clone(),
                state: Arc::clone(&self.state),
            }))
    }
}

#[derive(Default)]
struct SiteMap {
    /// Page state served on each successive visit to a URL; the last repeats.
    routes: HashMap<String, Vec<FakeState>>,
    visits: HashMap<String, usize>,
}

/// Fake browser serving scripted pages by URL.
#[derive(Clone, Default)]
pub(crate) struct FakeBrowser {
    sites: Arc<Mutex<SiteMap>>,
    sessions_started: Arc<AtomicUsize>,
    sessions_closed: Arc<AtomicUsize>,
    session_limit: Option<usize>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the first `limit` session launches succeed.
    pub fn with_session_limit(mut self, limit: usize) -> Self {
        self.session_limit = Some(limit);
        self
    }

    pub fn route(&self, url: &str, state: FakeState) {
        self.route_visits(url, vec![state]);
    }

    pub fn route_visits(&self, url: &str, states: Vec<FakeState>) {
        self.sites
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), states);
    }

    pub fn visits(&self, url: &str) -> usize {
        self.sites
            .lock()
            .unwrap()
            .visits
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeSession {
    sites: Arc<Mutex<SiteMap>>,
    closed: Arc<AtomicUsize>,
}

impl Browser for FakeBrowser {
    type Session = FakeSession;

    async fn new_session(&self) -> Result<FakeSession, BrowserError> {
        let started = self.sessions_started.fetch_add(1, Ordering::SeqCst);
        if self.session_limit.is_some_and(|limit| started >= limit) {
            return Err(BrowserError::Launch("session limit reached".to_string()));
        }
        Ok(FakeSession {
            sites: Arc::clone(&self.sites),
            closed: Arc::clone(&self.sessions_closed),
        })
    }
}

impl Session for FakeSession {
    type Page = FakePage;

    async fn open(&self, url: &str) -> Result<FakePage, BrowserError> {
        let mut sites = self.sites.lock().unwrap();
        let visit = {
            let count = sites.visits.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let states = sites
            .routes
            .get(url)
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                reason: "no route".to_string(),
            })?;
        let state = states[(visit - 1).min(states.len() - 1)].clone();
        Ok(FakePage::new(state))
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
