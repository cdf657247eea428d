//! Browser-driven product listing scraper.
//!
//! Two stages share one automation abstraction ([`browser`]):
//!
//! - [`discovery`] crawls a filtered results feed that loads more items on
//!   demand and yields [`dealgrid_core::ItemStub`]s.
//! - [`pool`] runs a bounded set of workers, each owning one browser session,
//!   that visit item pages through [`detail`] and fill in
//!   [`dealgrid_core::ProductRecord`]s.

pub mod browser;
pub mod challenge;
pub mod detail;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod images;
pub mod layout;
pub mod normalize;
pub mod pool;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{Browser, BrowserError, Element, Page, Session};
pub use detail::{DetailScraper, DetailTimeouts, ScrapeOutcome};
pub use discovery::{build_feed_url, CrawlSettings, FeedCrawler, FeedFilters, FeedHarvest, StopReason};
pub use error::ScraperError;
pub use extract::{ExtractedFields, ItemExtractor, LayoutExtractor};
pub use layout::{FeedLayout, ItemLayout};
pub use pool::{resolve_worker_count, run_detail_pool, ItemOutcome, PoolConfig, PoolReport};

#[cfg(feature = "chromium")]
pub use browser::chromium::{ChromiumBrowser, ChromiumOptions};
