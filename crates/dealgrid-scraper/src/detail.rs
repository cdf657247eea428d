//! Single item-page visit: navigate, clear bot checks, wait for content,
//! extract, and gate on the title.

use std::time::Duration;

use chrono::Utc;
use dealgrid_core::{AppConfig, ProductRecord};
use rand::Rng;

use crate::browser::{Page, Session};
use crate::challenge::{clear_interstitial, is_robot_title};
use crate::error::ScraperError;
use crate::extract::{ItemExtractor, LayoutExtractor};
use crate::layout::ItemLayout;
use crate::normalize::item_id_from_url;
use crate::wait::{wait_for_any, PollConfig};

/// Time bounds for one item-page visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailTimeouts {
    /// Page load bound.
    pub navigation: Duration,
    /// Per-field and per-container element wait.
    pub element: Duration,
    /// Deadline for the image script to appear.
    pub image_script: Duration,
    /// Navigation wait after dismissing a challenge.
    pub interstitial_navigation: Duration,
    pub poll_interval: Duration,
    /// Random pause before each navigation is drawn from `[jitter_min, jitter_max)`.
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl DetailTimeouts {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            navigation: config.navigation_timeout(),
            element: config.element_timeout(),
            image_script: config.image_script_timeout(),
            interstitial_navigation: Duration::from_secs(10),
            poll_interval: config.poll_interval(),
            jitter_min: Duration::from_millis(config.jitter_min_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
        }
    }

    fn element_poll(&self) -> PollConfig {
        PollConfig::new(self.element, self.poll_interval)
    }

    fn image_poll(&self) -> PollConfig {
        PollConfig::new(self.image_script, self.poll_interval)
    }

    fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        rand::rng().random_range(self.jitter_min..self.jitter_max)
    }
}

impl Default for DetailTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            element: Duration::from_secs(10),
            image_script: Duration::from_secs(15),
            interstitial_navigation: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(3),
        }
    }
}

/// What a successful [`DetailScraper::scrape`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The record already carried detail data; the page was not visited.
    AlreadyScraped,
    Scraped,
}

/// Drives one item-page visit end to end.
pub struct DetailScraper<E = LayoutExtractor> {
    layout: ItemLayout,
    timeouts: DetailTimeouts,
    extractor: E,
}

impl DetailScraper<LayoutExtractor> {
    #[must_use]
    pub fn new(layout: ItemLayout, timeouts: DetailTimeouts) -> Self {
        let extractor = LayoutExtractor::new(layout, timeouts.element_poll(), timeouts.image_poll());
        Self::with_extractor(layout, timeouts, extractor)
    }
}

impl<E: ItemExtractor> DetailScraper<E> {
    #[must_use]
    pub fn with_extractor(layout: ItemLayout, timeouts: DetailTimeouts, extractor: E) -> Self {
        Self {
            layout,
            timeouts,
            extractor,
        }
    }

    /// Visits `record.url` in `session` and fills in the detail fields.
    ///
    /// Fields are written to `record` only when the attempt passes the title
    /// gate; on any error the record is left exactly as it was, so a retry
    /// starts from the same state.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Navigation`] if the page cannot be opened or loaded
    /// - [`ScraperError::RobotCheck`] if the title marks a robot check
    /// - [`ScraperError::Interstitial`] if a challenge form cannot be cleared
    /// - [`ScraperError::ContainerNotFound`] if no content container appears
    /// - [`ScraperError::ExtractionIncomplete`] if no title was extracted
    pub async fn scrape<S: Session>(
        &self,
        session: &S,
        record: &mut ProductRecord,
    ) -> Result<ScrapeOutcome, ScraperError> {
        if record.has_details() {
            tracing::debug!(url = %record.url, "already scraped, skipping");
            return Ok(ScrapeOutcome::AlreadyScraped);
        }

        let pause = self.timeouts.jitter();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let url = record.url.clone();
        let page = session
            .open(&url)
            .await
            .map_err(|e| ScraperError::Navigation {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let result = self.visit(&page, &url, record).await;
        page.close().await;
        result
    }

    async fn visit<P: Page>(
        &self,
        page: &P,
        url: &str,
        record: &mut ProductRecord,
    ) -> Result<ScrapeOutcome, ScraperError> {
        page.wait_load(self.timeouts.navigation)
            .await
            .map_err(|e| ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let title = page.title().await?;
        if is_robot_title(&title, self.layout.robot_title_markers) {
            tracing::warn!(url, title = %title, "robot check page served");
            return Err(ScraperError::RobotCheck {
                url: url.to_string(),
                title,
            });
        }

        clear_interstitial(
            page,
            url,
            &self.layout,
            self.timeouts.element_poll(),
            self.timeouts.interstitial_navigation,
        )
        .await?;

        let Some((idx, _)) =
            wait_for_any(page, self.layout.containers, self.timeouts.element_poll()).await?
        else {
            return Err(ScraperError::ContainerNotFound {
                url: url.to_string(),
            });
        };
        if idx > 0 {
            tracing::debug!(url, container = self.layout.containers[idx], "using fallback container");
        }

        let fields = self.extractor.extract(page).await;
        if fields.title.is_empty() {
            return Err(ScraperError::ExtractionIncomplete {
                url: url.to_string(),
            });
        }

        fields.apply_to(record, Utc::now());
        tracing::info!(
            url,
            item_id = item_id_from_url(url).as_deref().unwrap_or(""),
            title = %record.title_english,
            "item scraped"
        );
        Ok(ScrapeOutcome::Scraped)
    }
}

#[cfg(test)]
#[path = "detail_test.rs"]
mod tests;
