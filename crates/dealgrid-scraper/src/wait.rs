//! Bounded polling waits built on [`Page::query`].
//!
//! Every wait checks at least once, then re-polls at `interval` until the
//! deadline. Nothing in the pipeline waits without a deadline.

use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{BrowserError, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    #[must_use]
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// A single check with no waiting.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub(crate) fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Sleeps one interval, or returns `false` if the deadline has passed.
    pub(crate) async fn pause_until(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let remaining = deadline - now;
        tokio::time::sleep(self.interval.min(remaining)).await;
        true
    }
}

/// Waits for `selector` to match. `Ok(None)` means the deadline passed.
///
/// # Errors
///
/// Propagates lookup failures from the page.
pub async fn wait_for_element<P: Page>(
    page: &P,
    selector: &str,
    poll: PollConfig,
) -> Result<Option<P::Element>, BrowserError> {
    let deadline = poll.deadline();
    loop {
        if let Some(element) = page.query(selector).await? {
            return Ok(Some(element));
        }
        if !poll.pause_until(deadline).await {
            return Ok(None);
        }
    }
}

/// Waits for the first of `selectors` (in priority order) to match.
///
/// Each round checks every selector before sleeping, so an earlier selector
/// wins only if it is present in the same round. Returns the index of the
/// selector that matched along with the element.
///
/// # Errors
///
/// Propagates lookup failures from the page.
pub async fn wait_for_any<P: Page>(
    page: &P,
    selectors: &[&str],
    poll: PollConfig,
) -> Result<Option<(usize, P::Element)>, BrowserError> {
    let deadline = poll.deadline();
    loop {
        for (idx, selector) in selectors.iter().enumerate() {
            if let Some(element) = page.query(selector).await? {
                return Ok(Some((idx, element)));
            }
        }
        if !poll.pause_until(deadline).await {
            return Ok(None);
        }
    }
}

/// Waits for `selector` to stop matching. Returns `true` if it disappeared
/// before the deadline.
///
/// # Errors
///
/// Propagates lookup failures from the page.
pub async fn wait_until_gone<P: Page>(
    page: &P,
    selector: &str,
    poll: PollConfig,
) -> Result<bool, BrowserError> {
    let deadline = poll.deadline();
    loop {
        if page.query(selector).await?.is_none() {
            return Ok(true);
        }
        if !poll.pause_until(deadline).await {
            return Ok(false);
        }
    }
}
