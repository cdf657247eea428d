//! Command handlers. Each one launches the browser it needs, runs one
//! pipeline stage, and writes JSON Lines.

use std::path::Path;
use std::sync::Arc;

use dealgrid_core::{AppConfig, ProductRecord};
use dealgrid_scraper::{
    run_detail_pool, Browser, ChromiumBrowser, ChromiumOptions, CrawlSettings, DetailScraper,
    DetailTimeouts, FeedCrawler, FeedFilters, FeedLayout, ItemLayout, PoolConfig, Session,
};

use crate::jsonl::{read_file, write_output, DetailInput};

fn build_crawler(config: &AppConfig) -> anyhow::Result<FeedCrawler> {
    Ok(FeedCrawler::new(
        &config.base_url,
        config.source_site.clone(),
        FeedLayout::amazon(),
        CrawlSettings::from_config(config),
    )?)
}

fn build_browser(config: &AppConfig) -> ChromiumBrowser {
    ChromiumBrowser::new(ChromiumOptions::from_config(config))
}

/// Pool settings from config, with an optional worker-count override.
pub(crate) fn pool_config(config: &AppConfig, workers: Option<usize>) -> PoolConfig {
    let base = PoolConfig::from_config(config);
    PoolConfig {
        workers: workers.map_or(base.workers, |n| n.max(1)),
        ..base
    }
}

pub(crate) async fn run_departments(config: &AppConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let crawler = build_crawler(config)?;
    let session = build_browser(config).new_session().await?;
    let result = crawler.departments(&session).await;
    session.close().await;

    let departments = result?;
    write_output(output, &departments)?;
    eprintln!("{} departments", departments.len());
    Ok(())
}

pub(crate) async fn run_discover(
    config: &AppConfig,
    filters: &FeedFilters,
    category: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let crawler = build_crawler(config)?;
    let feed_url = crawler.feed_url(filters)?;
    tracing::info!(url = %feed_url, category, "crawling feed");

    let session = build_browser(config).new_session().await?;
    let result = crawler.crawl(&session, &feed_url, category).await;
    session.close().await;

    let harvest = result?;
    write_output(output, &harvest.stubs)?;
    eprintln!(
        "discovered {} items in {} rounds (stopped: {:?})",
        harvest.stubs.len(),
        harvest.rounds,
        harvest.stop
    );
    Ok(())
}

pub(crate) async fn run_details(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let records: Vec<ProductRecord> = read_file::<DetailInput>(input)?
        .into_iter()
        .map(DetailInput::into_record)
        .collect();
    if records.is_empty() {
        eprintln!("no items in {}", input.display());
        return Ok(());
    }

    let scraper = Arc::new(DetailScraper::new(
        ItemLayout::amazon(),
        DetailTimeouts::from_config(config),
    ));
    let report = run_detail_pool(
        Arc::new(build_browser(config)),
        scraper,
        records,
        pool_config(config, workers),
    )
    .await;

    write_output(output, &report.records)?;
    eprintln!(
        "attempted {} items: {} succeeded ({} already done), {} failed",
        report.attempted,
        report.succeeded,
        report.skipped,
        report.failed()
    );
    Ok(())
}
