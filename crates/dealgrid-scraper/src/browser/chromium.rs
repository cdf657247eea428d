//! Chromium backend over the DevTools protocol.
//!
//! Every session is its own browser process with a throwaway profile
//! directory, so workers share no cookies, cache, or challenge state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::element::Element as CdpElement;
use chromiumoxide::Page as CdpPage;
use dealgrid_core::AppConfig;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::{Browser, BrowserError, Element, Page, Session};

static PROFILE_SEQ: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromiumOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
    /// Explicit browser binary; `None` lets the launcher search the usual
    /// install locations.
    pub executable: Option<PathBuf>,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            executable: None,
        }
    }
}

impl ChromiumOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            executable: None,
        }
    }
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumBrowser {
    options: ChromiumOptions,
}

impl ChromiumBrowser {
    #[must_use]
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }

    fn launch_config(&self, profile: &Path) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run");
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(ua) = &self.options.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        if let Some(exe) = &self.options.executable {
            builder = builder.chrome_executable(exe);
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

impl Browser for ChromiumBrowser {
    type Session = ChromiumSession;

    async fn new_session(&self) -> Result<ChromiumSession, BrowserError> {
        let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
        let profile =
            std::env::temp_dir().join(format!("dealgrid-profile-{}-{seq}", std::process::id()));
        let config = self.launch_config(&profile)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler event error");
                }
            }
        });
        tracing::debug!(profile = %profile.display(), headless = self.options.headless, "browser launched");

        Ok(ChromiumSession {
            browser: Some(browser),
            handler,
            profile,
        })
    }
}

/// One browser process. Dropping the session without [`Session::close`]
/// still kills the process and removes its profile.
pub struct ChromiumSession {
    browser: Option<CdpBrowser>,
    handler: JoinHandle<()>,
    profile: PathBuf,
}

impl Session for ChromiumSession {
    type Page = ChromiumPage;

    async fn open(&self, url: &str) -> Result<ChromiumPage, BrowserError> {
        let navigation = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| navigation("session already closed".to_string()))?;
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| navigation(e.to_string()))?;
        Ok(ChromiumPage { page })
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::debug!(error = %e, "browser close error");
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "browser process wait error");
            }
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.browser.is_some() {
            tracing::warn!(profile = %self.profile.display(), "browser session dropped without close");
        }
        // The inner browser kills its child process on drop.
        self.browser.take();
        self.handler.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.profile) {
            tracing::debug!(profile = %self.profile.display(), error = %e, "profile cleanup failed");
        }
    }
}

pub struct ChromiumPage {
    page: CdpPage,
}

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

fn script(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Script(e.to_string())
}

fn element(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Element(e.to_string())
}

impl Page for ChromiumPage {
    type Element = ChromiumElement;

    async fn wait_load(&self, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(protocol(e)),
            Err(_) => Err(BrowserError::Timeout {
                what: "page load".to_string(),
            }),
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(protocol)?
            .unwrap_or_default())
    }

    // The protocol reports "no match" as an error, so lookups map it to `None`.
    async fn query(&self, selector: &str) -> Result<Option<ChromiumElement>, BrowserError> {
        Ok(self
            .page
            .find_element(selector)
            .await
            .ok()
            .map(|inner| ChromiumElement { inner }))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ChromiumElement>, BrowserError> {
        Ok(self
            .page
            .find_elements(selector)
            .await
            .map(|found| {
                found
                    .into_iter()
                    .map(|inner| ChromiumElement { inner })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn wait_navigation(&self, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(protocol(e)),
            Err(_) => Err(BrowserError::Timeout {
                what: "navigation".to_string(),
            }),
        }
    }

    async fn evaluate<T>(&self, expression: &str) -> Result<T, BrowserError>
    where
        T: DeserializeOwned + Send,
    {
        self.page
            .evaluate(expression.to_string())
            .await
            .map_err(script)?
            .into_value::<T>()
            .map_err(script)
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), BrowserError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {dy})"))
            .await
            .map(|_| ())
            .map_err(script)
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "page close error");
        }
    }
}

pub struct ChromiumElement {
    inner: CdpElement,
}

impl Element for ChromiumElement {
    async fn text(&self) -> Result<String, BrowserError> {
        Ok(self
            .inner
            .inner_text()
            .await
            .map_err(element)?
            .unwrap_or_default())
    }

    async fn html(&self) -> Result<String, BrowserError> {
        Ok(self
            .inner
            .outer_html()
            .await
            .map_err(element)?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.inner.attribute(name).await.map_err(element)
    }

    async fn click(&self) -> Result<(), BrowserError> {
        self.inner.click().await.map(|_| ()).map_err(element)
    }

    async fn query(&self, selector: &str) -> Result<Option<ChromiumElement>, BrowserError> {
        Ok(self
            .inner
            .find_element(selector)
            .await
            .ok()
            .map(|inner| ChromiumElement { inner }))
    }
}
