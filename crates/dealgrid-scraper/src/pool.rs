//! Bounded worker pool for detail extraction.
//!
//! `W` workers drain a shared job queue. Each worker launches one browser
//! session for its whole lifetime and processes items one at a time with a
//! fixed number of attempts. Every input produces exactly one output: items
//! that exhaust their attempts, items held by a worker that panicked, and
//! items no worker could pick up (e.g. every session failed to launch) are
//! all forwarded unchanged.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dealgrid_core::{AppConfig, ProductRecord, WorkerSetting};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::browser::{Browser, Session};
use crate::detail::{DetailScraper, ScrapeOutcome};
use crate::error::ScraperError;
use crate::extract::ItemExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            workers: resolve_worker_count(config.workers),
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: resolve_worker_count(WorkerSetting::Auto),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Resolves a worker setting against this machine's logical CPU count.
#[must_use]
pub fn resolve_worker_count(setting: WorkerSetting) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .ok();
    setting.resolve(cpus)
}

/// How an item left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Scraped { attempts: u32 },
    AlreadyScraped,
    /// Every attempt failed; the record is unchanged.
    Exhausted { attempts: u32 },
    /// No worker finished the item (session launch failure or worker panic);
    /// the record is unchanged.
    Abandoned,
}

impl ItemOutcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, ItemOutcome::Scraped { .. } | ItemOutcome::AlreadyScraped)
    }
}

#[derive(Debug, Clone)]
pub struct ItemResult {
    pub record: ProductRecord,
    pub outcome: ItemOutcome,
}

/// Batch summary returned once every input has produced its output.
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    /// One record per input, in completion order.
    pub records: Vec<ProductRecord>,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

impl PoolReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

type JobQueue = Mutex<VecDeque<ProductRecord>>;
type InFlight = Mutex<Vec<Option<ProductRecord>>>;

fn pop_job(queue: &JobQueue) -> Option<ProductRecord> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

fn set_in_flight(in_flight: &InFlight, worker: usize, record: Option<ProductRecord>) {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)[worker] = record;
}

/// Runs every record through `scraper` with `config.workers` parallel
/// sessions and waits until all of them have produced an output.
pub async fn run_detail_pool<B, E>(
    browser: Arc<B>,
    scraper: Arc<DetailScraper<E>>,
    records: Vec<ProductRecord>,
    config: PoolConfig,
) -> PoolReport
where
    B: Browser + 'static,
    E: ItemExtractor + 'static,
{
    let total = records.len();
    if total == 0 {
        return PoolReport::default();
    }
    let workers = config.workers.clamp(1, total);
    tracing::info!(items = total, workers, "starting detail pool");

    let queue: Arc<JobQueue> = Arc::new(Mutex::new(VecDeque::from(records)));
    let in_flight: Arc<InFlight> = Arc::new(Mutex::new(vec![None; workers]));
    let (tx, mut rx) = mpsc::unbounded_channel::<ItemResult>();

    let mut set = JoinSet::new();
    for worker in 0..workers {
        set.spawn(run_worker(
            worker,
            Arc::clone(&browser),
            Arc::clone(&scraper),
            Arc::clone(&queue),
            Arc::clone(&in_flight),
            tx.clone(),
            config,
        ));
    }
    drop(tx);

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "detail worker terminated abnormally");
        }
    }

    let mut results = Vec::with_capacity(total);
    while let Ok(result) = rx.try_recv() {
        results.push(result);
    }

    let stranded: Vec<ProductRecord> = in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter_mut()
        .filter_map(Option::take)
        .chain(
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..),
        )
        .collect();
    if !stranded.is_empty() {
        tracing::warn!(count = stranded.len(), "forwarding items no worker completed");
    }
    results.extend(stranded.into_iter().map(|record| ItemResult {
        record,
        outcome: ItemOutcome::Abandoned,
    }));

    let report = summarize(results);
    tracing::info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed(),
        "detail pool finished"
    );
    report
}

fn summarize(results: Vec<ItemResult>) -> PoolReport {
    let attempted = results.len();
    let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
    let skipped = results
        .iter()
        .filter(|r| r.outcome == ItemOutcome::AlreadyScraped)
        .count();
    PoolReport {
        records: results.into_iter().map(|r| r.record).collect(),
        attempted,
        succeeded,
        skipped,
    }
}

async fn run_worker<B, E>(
    worker: usize,
    browser: Arc<B>,
    scraper: Arc<DetailScraper<E>>,
    queue: Arc<JobQueue>,
    in_flight: Arc<InFlight>,
    tx: mpsc::UnboundedSender<ItemResult>,
    config: PoolConfig,
) where
    B: Browser + 'static,
    E: ItemExtractor + 'static,
{
    let session = match browser.new_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(worker, error = %e, "worker could not start a browser session");
            return;
        }
    };
    tracing::debug!(worker, "worker session started");

    while let Some(record) = pop_job(&queue) {
        set_in_flight(&in_flight, worker, Some(record.clone()));
        let result = process_item(worker, &scraper, &session, record, config).await;
        set_in_flight(&in_flight, worker, None);
        if tx.send(result).is_err() {
            tracing::warn!(worker, "result channel closed");
            break;
        }
    }

    session.close().await;
    tracing::debug!(worker, "worker session closed");
}

async fn process_item<S, E>(
    worker: usize,
    scraper: &DetailScraper<E>,
    session: &S,
    mut record: ProductRecord,
    config: PoolConfig,
) -> ItemResult
where
    S: Session,
    E: ItemExtractor,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match scraper.scrape(session, &mut record).await {
            Ok(ScrapeOutcome::AlreadyScraped) => {
                return ItemResult {
                    record,
                    outcome: ItemOutcome::AlreadyScraped,
                };
            }
            Ok(ScrapeOutcome::Scraped) => {
                return ItemResult {
                    record,
                    outcome: ItemOutcome::Scraped { attempts: attempt },
                };
            }
            Err(err) => {
                log_attempt_failure(worker, &record.url, attempt, max_attempts, &err);
                if attempt >= max_attempts {
                    return ItemResult {
                        record,
                        outcome: ItemOutcome::Exhausted { attempts: attempt },
                    };
                }
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }
}

fn log_attempt_failure(worker: usize, url: &str, attempt: u32, max: u32, err: &ScraperError) {
    let exhausted = attempt >= max;
    if matches!(err, ScraperError::RobotCheck { .. }) {
        tracing::warn!(worker, url, attempt, max, exhausted, kind = err.kind(), "robot check served");
    } else if exhausted {
        tracing::warn!(worker, url, attempt, kind = err.kind(), error = %err, "item failed after all attempts");
    } else {
        tracing::warn!(worker, url, attempt, max, kind = err.kind(), error = %err, "attempt failed, retrying");
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
