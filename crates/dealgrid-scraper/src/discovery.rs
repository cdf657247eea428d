//! Results-grid discovery: build a filtered feed URL, then harvest item
//! links from a feed that loads more content on demand.
//!
//! A crawl is single-threaded and owns its seen-URL set; nothing persists
//! between crawls. Each round records the page height, harvests the cards
//! currently rendered, and then either stops at the end-of-results marker,
//! clicks "load more", or scrolls like a reader would. Scroll rounds that do
//! not grow the page count toward the stuck limit.

use std::collections::HashSet;
use std::time::Duration;

use dealgrid_core::{AppConfig, DepartmentOption, ItemStub};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use serde::Serialize;
use url::Url;

use crate::browser::{Element, Page, Session};
use crate::error::ScraperError;
use crate::layout::FeedLayout;
use crate::normalize::parse_badge_percent;
use crate::wait::{wait_for_element, wait_until_gone, PollConfig};

pub(crate) const PAGE_HEIGHT_JS: &str = "document.documentElement.scrollHeight";
pub(crate) const VIEWPORT_HEIGHT_JS: &str = "window.innerHeight";
pub(crate) const AT_BOTTOM_JS: &str =
    "window.innerHeight + window.pageYOffset >= document.body.scrollHeight - 10";

/// Characters left bare by a query-component escape: ASCII alphanumerics and `-_.~`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// User-chosen feed filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFilters {
    /// Department filter value (not the label).
    pub department: String,
    pub min_price: u32,
    pub max_price: u32,
    pub min_percent_off: u32,
    pub max_percent_off: u32,
}

#[derive(Serialize)]
struct FilterPayload<'a> {
    state: FilterState<'a>,
    version: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterState<'a> {
    range_refinement_filters: RangeFilters,
    refinement_filters: RefinementFilters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeFilters {
    percent_off: Range,
    price: Range,
}

#[derive(Serialize)]
struct Range {
    min: u32,
    max: u32,
}

#[derive(Serialize)]
struct RefinementFilters<'a> {
    departments: [&'a str; 1],
}

/// Builds the filtered feed URL.
///
/// The filters are serialized to JSON, the JSON is embedded as a quoted
/// string literal, and that literal is query-escaped twice before being
/// appended as the feed's filter parameter.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` is not an absolute
/// http(s) URL, or [`ScraperError::FeedPayload`] if serialization fails.
pub fn build_feed_url(
    base_url: &str,
    layout: &FeedLayout,
    filters: &FeedFilters,
) -> Result<String, ScraperError> {
    let base = parse_base_url(base_url)?;
    let payload = FilterPayload {
        state: FilterState {
            range_refinement_filters: RangeFilters {
                percent_off: Range {
                    min: filters.min_percent_off,
                    max: filters.max_percent_off,
                },
                price: Range {
                    min: filters.min_price,
                    max: filters.max_price,
                },
            },
            refinement_filters: RefinementFilters {
                departments: [filters.department.as_str()],
            },
        },
        version: 1,
    };
    let json = serde_json::to_string(&payload).map_err(ScraperError::FeedPayload)?;
    let quoted = serde_json::to_string(&json).map_err(ScraperError::FeedPayload)?;
    let once = utf8_percent_encode(&quoted, QUERY_COMPONENT).to_string();
    let twice = utf8_percent_encode(&once, QUERY_COMPONENT).to_string();

    Ok(format!(
        "{}{}?{}={}",
        origin_str(&base),
        layout.path,
        layout.filter_param,
        twice
    ))
}

fn parse_base_url(base_url: &str) -> Result<Url, ScraperError> {
    let invalid = |reason: String| ScraperError::InvalidBaseUrl {
        base_url: base_url.to_string(),
        reason,
    };
    let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}

fn origin_str(base: &Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}

/// De-duplication key: the link resolved against the site, without query or
/// fragment.
fn dedup_key(resolved: &Url) -> String {
    let mut key = resolved.clone();
    key.set_query(None);
    key.set_fragment(None);
    key.to_string()
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The feed rendered its end-of-results marker.
    EndOfResults,
    /// Scrolling stopped growing the page for the configured number of rounds.
    Stuck,
    RoundLimit,
    /// The page height could not be read, so progress could not be judged.
    HeightUnavailable,
}

#[derive(Debug, Clone)]
pub struct FeedHarvest {
    /// Unique stubs in discovery order.
    pub stubs: Vec<ItemStub>,
    pub rounds: usize,
    pub stop: StopReason,
}

/// Timing and termination knobs for a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub navigation_timeout: Duration,
    pub max_rounds: usize,
    pub stuck_rounds: u32,
    pub poll_interval: Duration,
    /// How long to wait for a loading indicator after clicking "load more".
    pub spinner_appear: Duration,
    /// Bound on the loading indicator disappearing once shown.
    pub spinner_gone: Duration,
    /// Pause after "load more" when no loading indicator showed up.
    pub load_settle: Duration,
    /// Pause after a scroll round before re-measuring the page.
    pub scroll_settle: Duration,
    pub scroll_steps: usize,
    pub step_pause_min: Duration,
    pub step_pause_max: Duration,
    pub wiggle_pause: Duration,
    /// Wait for the department "see more" control.
    pub expand_wait: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(40),
            max_rounds: 100,
            stuck_rounds: 3,
            poll_interval: Duration::from_millis(500),
            spinner_appear: Duration::from_secs(5),
            spinner_gone: Duration::from_secs(30),
            load_settle: Duration::from_millis(500),
            scroll_settle: Duration::from_secs(1),
            scroll_steps: 10,
            step_pause_min: Duration::from_millis(100),
            step_pause_max: Duration::from_millis(250),
            wiggle_pause: Duration::from_millis(200),
            expand_wait: Duration::from_secs(5),
        }
    }
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_rounds: config.max_feed_rounds,
            stuck_rounds: config.stuck_rounds,
            poll_interval: config.poll_interval(),
            ..Self::default()
        }
    }

    fn step_pause(&self) -> Duration {
        if self.step_pause_max <= self.step_pause_min {
            return self.step_pause_min;
        }
        rand::rng().random_range(self.step_pause_min..self.step_pause_max)
    }
}

/// Crawls one site's results feed.
#[derive(Debug, Clone)]
pub struct FeedCrawler {
    base: Url,
    source_site: String,
    layout: FeedLayout,
    settings: CrawlSettings,
}

impl FeedCrawler {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(
        base_url: &str,
        source_site: impl Into<String>,
        layout: FeedLayout,
        settings: CrawlSettings,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            base: parse_base_url(base_url)?,
            source_site: source_site.into(),
            layout,
            settings,
        })
    }

    /// # Errors
    ///
    /// See [`build_feed_url`].
    pub fn feed_url(&self, filters: &FeedFilters) -> Result<String, ScraperError> {
        build_feed_url(self.base.as_str(), &self.layout, filters)
    }

    /// Opens the unfiltered feed, expands the department filter, and lists
    /// its options. Options without a value are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Navigation`] if the feed page does not load.
    pub async fn departments<S: Session>(
        &self,
        session: &S,
    ) -> Result<Vec<DepartmentOption>, ScraperError> {
        let url = format!("{}{}", origin_str(&self.base), self.layout.path);
        let page = self.open(session, &url).await?;
        let result = self.read_departments(&page).await;
        page.close().await;
        result
    }

    /// Navigates to `feed_url` and harvests every item link, tagging stubs
    /// with `category`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Navigation`] if the feed page does not load.
    /// Problems after the page has loaded end the crawl early instead.
    pub async fn crawl<S: Session>(
        &self,
        session: &S,
        feed_url: &str,
        category: &str,
    ) -> Result<FeedHarvest, ScraperError> {
        let page = self.open(session, feed_url).await?;
        let harvest = self.collect_grid(&page, category).await;
        page.close().await;
        tracing::info!(
            category,
            stubs = harvest.stubs.len(),
            rounds = harvest.rounds,
            stop = ?harvest.stop,
            "feed crawl finished"
        );
        Ok(harvest)
    }

    async fn open<S: Session>(&self, session: &S, url: &str) -> Result<S::Page, ScraperError> {
        let navigation = |e: crate::browser::BrowserError| ScraperError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let page = session.open(url).await.map_err(navigation)?;
        if let Err(e) = page.wait_load(self.settings.navigation_timeout).await {
            page.close().await;
            return Err(navigation(e));
        }
        Ok(page)
    }

    async fn read_departments<P: Page>(
        &self,
        page: &P,
    ) -> Result<Vec<DepartmentOption>, ScraperError> {
        let expand_poll = PollConfig::new(self.settings.expand_wait, self.settings.poll_interval);
        if let Some(expand) = wait_for_element(page, self.layout.departments_expand, expand_poll).await? {
            if let Err(e) = expand.click().await {
                tracing::debug!(error = %e, "could not expand department list");
            } else {
                tokio::time::sleep(self.settings.load_settle).await;
            }
        }

        let mut departments = Vec::new();
        for option in page.query_all(self.layout.department_option).await? {
            let value = match option.query(self.layout.department_input).await? {
                Some(input) => input.attribute("value").await?.unwrap_or_default(),
                None => String::new(),
            };
            if value.is_empty() {
                continue;
            }
            let label = match option.query(self.layout.department_label).await? {
                Some(label) => label.text().await?.trim().to_string(),
                None => String::new(),
            };
            let label = if label.is_empty() {
                option.text().await?.trim().to_string()
            } else {
                label
            };
            departments.push(DepartmentOption { value, label });
        }
        tracing::info!(count = departments.len(), "departments listed");
        Ok(departments)
    }

    /// Runs the incremental collection loop on an already-loaded feed page.
    pub(crate) async fn collect_grid<P: Page>(&self, page: &P, category: &str) -> FeedHarvest {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stubs = Vec::new();
        let mut stuck = 0u32;
        let mut rounds = 0usize;
        let mut stop = StopReason::RoundLimit;

        while rounds < self.settings.max_rounds {
            rounds += 1;

            let Some(before) = page_height(page).await else {
                stop = StopReason::HeightUnavailable;
                break;
            };

            let added = self.harvest_cards(page, category, &mut seen, &mut stubs).await;
            if added > 0 {
                tracing::debug!(round = rounds, added, total = stubs.len(), "new items found");
            }

            match self.footer_action(page).await {
                FooterAction::End => {
                    stop = StopReason::EndOfResults;
                    break;
                }
                FooterAction::LoadedMore => continue,
                FooterAction::Scroll => {}
            }

            if let Err(e) = self.humanlike_scroll(page).await {
                tracing::debug!(error = %e, "scroll step failed");
            }
            tokio::time::sleep(self.settings.scroll_settle).await;

            let Some(after) = page_height(page).await else {
                stop = StopReason::HeightUnavailable;
                break;
            };
            if (after - before).abs() < 0.5 {
                stuck += 1;
                tracing::debug!(round = rounds, stuck, "page height unchanged");
                if stuck >= self.settings.stuck_rounds {
                    stop = StopReason::Stuck;
                    break;
                }
            } else {
                stuck = 0;
            }
        }

        FeedHarvest {
            stubs,
            rounds,
            stop,
        }
    }

    /// Adds stubs for cards whose link has not been seen in this crawl.
    async fn harvest_cards<P: Page>(
        &self,
        page: &P,
        category: &str,
        seen: &mut HashSet<String>,
        stubs: &mut Vec<ItemStub>,
    ) -> usize {
        let cards = match page.query_all(self.layout.card).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::debug!(error = %e, "card lookup failed");
                return 0;
            }
        };

        let mut added = 0;
        for card in &cards {
            let Some(href) = child_attribute(card, self.layout.card_link, "href").await else {
                continue;
            };
            let Ok(resolved) = self.base.join(&href) else {
                tracing::debug!(href = %href, "unresolvable card link");
                continue;
            };
            if !seen.insert(dedup_key(&resolved)) {
                continue;
            }

            let listing_title = child_text(card, self.layout.card_title)
                .await
                .filter(|t| !t.is_empty());
            let discount_percent = child_text(card, self.layout.card_badge)
                .await
                .and_then(|badge| parse_badge_percent(&badge));

            stubs.push(ItemStub {
                url: resolved.to_string(),
                source_site: self.source_site.clone(),
                category: category.to_string(),
                discount_percent,
                listing_title,
            });
            added += 1;
        }
        added
    }

    async fn footer_action<P: Page>(&self, page: &P) -> FooterAction {
        let Ok(Some(footer)) = page.query(self.layout.footer).await else {
            return FooterAction::Scroll;
        };
        if matches!(footer.query(self.layout.end_marker).await, Ok(Some(_))) {
            tracing::debug!("end of results marker found");
            return FooterAction::End;
        }
        let Ok(Some(button)) = footer.query(self.layout.load_more).await else {
            return FooterAction::Scroll;
        };
        if let Err(e) = button.click().await {
            tracing::debug!(error = %e, "load more click failed, scrolling instead");
            return FooterAction::Scroll;
        }
        self.await_load_more(page).await;
        FooterAction::LoadedMore
    }

    /// Waits for the loading indicator to appear and then vanish, or settles
    /// briefly if it never shows.
    async fn await_load_more<P: Page>(&self, page: &P) {
        let appear = PollConfig::new(self.settings.spinner_appear, self.settings.poll_interval);
        match wait_for_element(page, self.layout.spinner, appear).await {
            Ok(Some(_)) => {
                let gone = PollConfig::new(self.settings.spinner_gone, self.settings.poll_interval);
                if !matches!(wait_until_gone(page, self.layout.spinner, gone).await, Ok(true)) {
                    tracing::debug!("loading indicator still visible after wait");
                }
            }
            _ => tokio::time::sleep(self.settings.load_settle).await,
        }
    }

    /// Scrolls down in half-viewport steps with short random pauses until
    /// the bottom is reached, then nudges up and down to fire lazy-load
    /// listeners.
    #[allow(clippy::cast_possible_truncation)]
    async fn humanlike_scroll<P: Page>(&self, page: &P) -> Result<(), ScraperError> {
        let viewport = page.evaluate::<f64>(VIEWPORT_HEIGHT_JS).await?;
        let step = ((viewport * 0.5).round() as i64).max(1);
        for _ in 0..self.settings.scroll_steps {
            if page.evaluate::<bool>(AT_BOTTOM_JS).await? {
                break;
            }
            page.scroll_by(step).await?;
            tokio::time::sleep(self.settings.step_pause()).await;
        }
        page.scroll_by(-200).await?;
        tokio::time::sleep(self.settings.wiggle_pause).await;
        page.scroll_by(400).await?;
        Ok(())
    }
}

async fn page_height<P: Page>(page: &P) -> Option<f64> {
    match page.evaluate::<f64>(PAGE_HEIGHT_JS).await {
        Ok(height) => Some(height),
        Err(e) => {
            tracing::warn!(error = %e, "could not read page height");
            None
        }
    }
}

enum FooterAction {
    End,
    LoadedMore,
    Scroll,
}

async fn child_text<E: Element>(parent: &E, selector: &str) -> Option<String> {
    let child = parent.query(selector).await.ok().flatten()?;
    child.text().await.ok().map(|t| t.trim().to_string())
}

async fn child_attribute<E: Element>(parent: &E, selector: &str, name: &str) -> Option<String> {
    let child = parent.query(selector).await.ok().flatten()?;
    child
        .attribute(name)
        .await
        .ok()
        .flatten()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
