//! Headless-browser automation capability consumed by the scraping pipeline.
//!
//! The pipeline never talks to a concrete browser product. It is written
//! against the four traits below, so the Chromium backend (feature
//! `chromium`) and the in-crate test fake are interchangeable.
//!
//! Lifetimes follow the resource model of the worker pool: a [`Browser`]
//! hands out independent [`Session`]s, each session opens [`Page`]s, and
//! pages yield [`Element`] handles. Sessions and pages are closed explicitly
//! by value.

#[cfg(feature = "chromium")]
pub mod chromium;

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("element operation failed: {0}")]
    Element(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// A launcher for independent automation sessions.
pub trait Browser: Send + Sync {
    type Session: Session + 'static;

    /// Starts a fresh session. Each worker calls this once for its lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] when the session cannot be started.
    fn new_session(&self) -> impl Future<Output = Result<Self::Session, BrowserError>> + Send;
}

/// One isolated browsing context.
pub trait Session: Send + Sync {
    type Page: Page;

    /// Opens `url` in a new page. Does not wait for the load event; call
    /// [`Page::wait_load`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Navigation`] when the page cannot be created or
    /// the navigation is rejected outright.
    fn open(&self, url: &str) -> impl Future<Output = Result<Self::Page, BrowserError>> + Send;

    /// Releases the session and everything it owns.
    fn close(self) -> impl Future<Output = ()> + Send;
}

pub trait Page: Send + Sync {
    type Element: Element;

    /// Waits for the document load event, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Timeout`] or [`BrowserError::Navigation`].
    fn wait_load(&self, timeout: Duration) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Returns the document title, empty when the page has none.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Protocol`] if the title cannot be read.
    fn title(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Returns the first element matching `selector`, or `None` right away if
    /// nothing matches. Use [`crate::wait`] for bounded waits.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Protocol`] when the lookup itself fails.
    fn query(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Option<Self::Element>, BrowserError>> + Send;

    /// Returns every element matching `selector` in document order.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Protocol`] when the lookup itself fails.
    fn query_all(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<Self::Element>, BrowserError>> + Send;

    /// Waits for an in-flight navigation (e.g. after a form submit) to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Timeout`] if the navigation does not complete
    /// within `timeout`.
    fn wait_navigation(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Evaluates a JavaScript expression and deserializes its result.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Script`] if evaluation throws or the value does
    /// not deserialize into `T`.
    fn evaluate<T>(&self, expression: &str) -> impl Future<Output = Result<T, BrowserError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Scrolls the viewport vertically by `dy` CSS pixels (negative is up).
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Script`] if the scroll cannot be performed.
    fn scroll_by(&self, dy: i64) -> impl Future<Output = Result<(), BrowserError>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

pub trait Element: Send + Sync + Sized {
    /// Rendered text content.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Element`] if the node is gone.
    fn text(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Outer HTML of the element.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Element`] if the node is gone.
    fn html(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// # Errors
    ///
    /// Returns [`BrowserError::Element`] if the node is gone.
    fn attribute(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, BrowserError>> + Send;

    /// # Errors
    ///
    /// Returns [`BrowserError::Element`] if the node cannot be clicked.
    fn click(&self) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// First descendant matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Protocol`] when the lookup itself fails.
    fn query(&self, selector: &str) -> impl Future<Output = Result<Option<Self>, BrowserError>> + Send;
}
