use std::collections::HashSet;

use dealgrid_core::ProductStatus;

use super::*;
use crate::browser::{Element, Page};
use crate::detail::DetailTimeouts;
use crate::extract::ExtractedFields;
use crate::layout::ItemLayout;
use crate::testing::{FakeBrowser, FakeNode, FakeState};

fn fast_timeouts() -> DetailTimeouts {
    DetailTimeouts {
        navigation: Duration::from_millis(20),
        element: Duration::from_millis(5),
        image_script: Duration::from_millis(5),
        interstitial_navigation: Duration::from_millis(5),
        poll_interval: Duration::from_millis(1),
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
    }
}

fn fast_scraper() -> Arc<DetailScraper> {
    Arc::new(DetailScraper::new(ItemLayout::amazon(), fast_timeouts()))
}

fn pool_config(workers: usize) -> PoolConfig {
    PoolConfig {
        workers,
        max_attempts: 3,
        retry_delay: Duration::from_millis(1),
    }
}

fn item_url(n: usize) -> String {
    format!("https://www.amazon.ae/dp/B00000000{n}")
}

fn item_page(title: &str) -> FakeState {
    FakeState::default()
        .with_title("Amazon.ae")
        .with("#ppd", FakeNode::text(""))
        .with("#productTitle", FakeNode::text(title))
}

fn broken_page() -> FakeState {
    FakeState::default()
        .with_title("Amazon.ae")
        .with("#ppd", FakeNode::text(""))
}

fn records(count: usize) -> Vec<ProductRecord> {
    (0..count)
        .map(|n| ProductRecord::new(item_url(n), "amazon.ae", "Electronics"))
        .collect()
}

fn browser_with_items(count: usize) -> FakeBrowser {
    let browser = FakeBrowser::new();
    for n in 0..count {
        browser.route(&item_url(n), item_page(&format!("Item {n}")));
    }
    browser
}

// -----------------------------------------------------------------------
// totality
// -----------------------------------------------------------------------

#[tokio::test]
async fn every_input_produces_one_output_despite_failures() {
    let browser = browser_with_items(5);
    browser.route(&item_url(3), broken_page());

    let report = run_detail_pool(Arc::new(browser.clone()), fast_scraper(), records(5), pool_config(2)).await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.records.len(), 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed(), 1);

    let urls: HashSet<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 5);

    let failed = report
        .records
        .iter()
        .find(|r| r.url == item_url(3))
        .unwrap();
    assert!(failed.title_english.is_empty());
    assert!(failed.scraped_at.is_none());
    assert_eq!(failed.status, ProductStatus::NeedsDetails);
    assert_eq!(browser.visits(&item_url(3)), 3);
}

/// Reads the title and panics on one poisoned value.
struct PanickingExtractor {
    trigger: &'static str,
}

impl ItemExtractor for PanickingExtractor {
    async fn extract<P: Page>(&self, page: &P) -> ExtractedFields {
        let title = match page.query("#productTitle").await {
            Ok(Some(node)) => node.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        assert_ne!(title, self.trigger, "extractor blew up");
        ExtractedFields {
            title,
            ..ExtractedFields::default()
        }
    }
}

#[tokio::test]
async fn worker_panic_still_forwards_its_item() {
    let browser = browser_with_items(4);
    browser.route(&item_url(1), item_page("Explode"));
    let scraper = Arc::new(DetailScraper::with_extractor(
        ItemLayout::amazon(),
        fast_timeouts(),
        PanickingExtractor { trigger: "Explode" },
    ));

    let report = run_detail_pool(Arc::new(browser), scraper, records(4), pool_config(2)).await;

    assert_eq!(report.attempted, 4);
    assert_eq!(report.records.len(), 4);
    let urls: HashSet<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 4);

    let panicked = report
        .records
        .iter()
        .find(|r| r.url == item_url(1))
        .unwrap();
    assert_eq!(
        *panicked,
        ProductRecord::new(item_url(1), "amazon.ae", "Electronics")
    );
    assert_eq!(report.succeeded, 3);
}

#[tokio::test]
async fn more_workers_than_items_is_fine() {
    let browser = browser_with_items(2);
    let report = run_detail_pool(Arc::new(browser), fast_scraper(), records(2), pool_config(8)).await;
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.succeeded, 2);
}

#[tokio::test]
async fn empty_input_returns_empty_report() {
    let report = run_detail_pool(
        Arc::new(FakeBrowser::new()),
        fast_scraper(),
        Vec::new(),
        pool_config(4),
    )
    .await;
    assert_eq!(report.attempted, 0);
    assert!(report.records.is_empty());
}

// -----------------------------------------------------------------------
// retries
// -----------------------------------------------------------------------

#[tokio::test]
async fn transient_failure_succeeds_on_retry() {
    let browser = FakeBrowser::new();
    browser.route_visits(&item_url(0), vec![broken_page(), item_page("Second try")]);

    let report = run_detail_pool(Arc::new(browser.clone()), fast_scraper(), records(1), pool_config(1)).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.records[0].title_english, "Second try");
    assert_eq!(browser.visits(&item_url(0)), 2);
}

#[tokio::test]
async fn already_scraped_items_are_forwarded_without_visit() {
    let browser = browser_with_items(1);
    let mut done = records(1);
    done[0].title_english = "Done before".to_string();

    let report = run_detail_pool(Arc::new(browser.clone()), fast_scraper(), done, pool_config(1)).await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(browser.visits(&item_url(0)), 0);
}

// -----------------------------------------------------------------------
// sessions
// -----------------------------------------------------------------------

#[tokio::test]
async fn each_worker_uses_one_session_for_its_lifetime() {
    let browser = browser_with_items(6);
    let report = run_detail_pool(Arc::new(browser.clone()), fast_scraper(), records(6), pool_config(2)).await;

    assert_eq!(report.succeeded, 6);
    assert_eq!(browser.sessions_started(), 2);
    assert_eq!(browser.sessions_closed(), 2);
}

#[tokio::test]
async fn items_are_forwarded_when_no_session_starts() {
    let browser = browser_with_items(3).with_session_limit(0);
    let report = run_detail_pool(Arc::new(browser), fast_scraper(), records(3), pool_config(2)).await;

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.succeeded, 0);
    assert!(report.records.iter().all(|r| r.title_english.is_empty()));
}

#[tokio::test]
async fn surviving_worker_drains_queue_when_others_fail_to_start() {
    let browser = browser_with_items(4).with_session_limit(1);
    let report = run_detail_pool(Arc::new(browser), fast_scraper(), records(4), pool_config(3)).await;

    assert_eq!(report.records.len(), 4);
    assert_eq!(report.succeeded, 4);
}

#[test]
fn fixed_worker_setting_is_honoured() {
    assert_eq!(resolve_worker_count(WorkerSetting::Fixed(3)), 3);
}

#[test]
fn auto_worker_setting_is_within_bounds() {
    let workers = resolve_worker_count(WorkerSetting::Auto);
    assert!((1..=16).contains(&workers));
}
