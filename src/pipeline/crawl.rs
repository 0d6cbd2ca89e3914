// src/pipeline/crawl.rs

//! Best-seller crawling pipeline.
//!
//! Walks listing pages one at a time, enriches every new book from its
//! product page and stops at the record limit, the page budget, the last
//! page, or the first listing page that cannot be fetched. Requests are
//! strictly sequential and separated by politeness delays.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    BookDetails, Config, CrawlConfig, DedupKey, DedupStage, DelayRange, EnrichedRecord,
    ListingItem,
};
use crate::services::{DetailExtractor, FetchClient, ListingExtractor, PaginationNavigator};
use crate::storage::RecordStorage;
use crate::utils::Clock;

/// Why a crawl ended.
#[derive(Debug)]
pub enum StopReason {
    /// Collected as many records as requested
    LimitReached,
    /// Fetched the maximum number of listing pages
    PageBudgetExhausted,
    /// The last listing page had no next link
    NoNextPage,
    /// Pagination pointed back to a page already crawled
    RevisitedPage(String),
    /// A listing page could not be fetched; `first_page` if nothing was fetched yet
    ListingFetchFailed { error: AppError, first_page: bool },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::LimitReached => write!(f, "record limit reached"),
            StopReason::PageBudgetExhausted => write!(f, "page budget exhausted"),
            StopReason::NoNextPage => write!(f, "no next page"),
            StopReason::RevisitedPage(url) => write!(f, "pagination loops back to {url}"),
            StopReason::ListingFetchFailed { error, .. } => {
                write!(f, "listing page failed: {error}")
            }
        }
    }
}

/// Summary of a crawl run.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Records in discovery order
    pub records: Vec<EnrichedRecord>,
    pub pages_visited: usize,
    pub detail_total: usize,
    pub detail_failures: usize,
    pub stop: StopReason,
}

impl CrawlOutcome {
    /// True when the very first listing page could not be fetched.
    pub fn first_page_failed(&self) -> bool {
        matches!(
            self.stop,
            StopReason::ListingFetchFailed {
                first_page: true,
                ..
            }
        )
    }
}

/// Mutable state of one crawl; lives only for the duration of [`BookCrawler::crawl`].
struct CrawlState {
    collected: Vec<EnrichedRecord>,
    seen: HashSet<DedupKey>,
    visited: HashSet<String>,
    pages_visited: usize,
    current_url: Option<String>,
    requests: usize,
    detail_total: usize,
    detail_failures: usize,
    rng: fastrand::Rng,
}

impl CrawlState {
    fn new(start_url: &str, seed: u64) -> Self {
        Self {
            collected: Vec::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            pages_visited: 0,
            current_url: Some(start_url.to_string()),
            requests: 0,
            detail_total: 0,
            detail_failures: 0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    fn finish(mut self, limit: usize, stop: StopReason) -> CrawlOutcome {
        self.collected.truncate(limit);
        CrawlOutcome {
            records: self.collected,
            pages_visited: self.pages_visited,
            detail_total: self.detail_total,
            detail_failures: self.detail_failures,
            stop,
        }
    }
}

/// Sequential crawler combining fetch, extraction and pagination.
pub struct BookCrawler {
    config: CrawlConfig,
    fetcher: FetchClient,
    listing: ListingExtractor,
    details: DetailExtractor,
    pagination: PaginationNavigator,
    clock: Arc<dyn Clock>,
}

impl BookCrawler {
    /// Build a crawler, compiling every selector up front.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            config: config.crawl.clone(),
            fetcher: FetchClient::new(&config.fetch, Arc::clone(&clock))?,
            listing: ListingExtractor::new(&config.selectors.listing)?,
            details: DetailExtractor::new(&config.selectors.detail, config.crawl.genre_fallback)?,
            pagination: PaginationNavigator::new(&config.selectors.pagination)?,
            clock,
        })
    }

    /// Run the crawl. Never fails: a listing fetch failure ends the run with
    /// whatever was collected before it.
    pub async fn crawl(&self) -> CrawlOutcome {
        let limit = self.config.limit;
        let seed = self.clock.now().timestamp_micros() as u64;
        let mut state = CrawlState::new(&self.config.start_url, seed);

        if limit == 0 {
            return state.finish(limit, StopReason::LimitReached);
        }
        if self.config.max_pages == 0 {
            return state.finish(limit, StopReason::PageBudgetExhausted);
        }

        let stop = loop {
            let Some(url) = state.current_url.take() else {
                break StopReason::NoNextPage;
            };

            self.pace(&mut state, self.config.page_delay_ms).await;
            log::info!("Fetching list page {}: {}", state.pages_visited + 1, url);

            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(error) => {
                    log::error!("{}", error);
                    let first_page = state.pages_visited == 0;
                    break StopReason::ListingFetchFailed { error, first_page };
                }
            };
            state.pages_visited += 1;
            state.visited.insert(url.clone());

            let page_url = Url::parse(&page.url).or_else(|_| Url::parse(&self.config.base_url));
            let (items, next) = match page_url {
                Ok(page_url) => {
                    let document = Html::parse_document(&page.body);
                    (
                        self.listing.extract(&document, &page_url),
                        self.pagination.next_url(&document, &page_url),
                    )
                }
                Err(e) => {
                    log::error!("Cannot resolve links on {}: {}", url, e);
                    (Vec::new(), None)
                }
            };
            log::info!("Found {} books on this page", items.len());

            for item in items {
                if state.collected.len() >= limit {
                    break;
                }
                self.process_item(&mut state, item).await;
            }

            if state.collected.len() >= limit {
                break StopReason::LimitReached;
            }
            if state.pages_visited >= self.config.max_pages {
                break StopReason::PageBudgetExhausted;
            }
            match next {
                None => break StopReason::NoNextPage,
                Some(next) if state.visited.contains(&next) => {
                    break StopReason::RevisitedPage(next);
                }
                Some(next) => state.current_url = Some(next),
            }
        };

        log::info!(
            "Crawl finished ({}): {} records from {} page(s)",
            stop,
            state.collected.len(),
            state.pages_visited
        );
        state.finish(limit, stop)
    }

    async fn process_item(&self, state: &mut CrawlState, item: ListingItem) {
        let key = item.dedup_key();

        match self.config.dedup_stage {
            DedupStage::BeforeEnrichment => {
                if !state.seen.insert(key) {
                    log::debug!("Skipping duplicate: {}", item.title);
                    return;
                }
                let record = self.enrich(state, item).await;
                self.push(state, record);
            }
            DedupStage::AfterEnrichment => {
                let record = self.enrich(state, item).await;
                if state.seen.insert(key) {
                    self.push(state, record);
                } else {
                    log::debug!("Dropping duplicate after enrichment: {}", record.title);
                }
            }
        }
    }

    fn push(&self, state: &mut CrawlState, record: EnrichedRecord) {
        log::info!(
            "Collected {}/{}: {}",
            state.collected.len() + 1,
            self.config.limit,
            record.title
        );
        state.collected.push(record);
    }

    /// Fetch and merge product details; any failure leaves them empty.
    async fn enrich(&self, state: &mut CrawlState, item: ListingItem) -> EnrichedRecord {
        let Some(detail_url) = item.detail_url.clone() else {
            return EnrichedRecord::unenriched(item);
        };

        self.pace(state, self.config.detail_delay_ms).await;
        state.detail_total += 1;

        match self.fetcher.fetch(&detail_url).await {
            Ok(page) => {
                let details: BookDetails = {
                    let document = Html::parse_document(&page.body);
                    self.details.extract(&document)
                };
                EnrichedRecord::merge(item, details)
            }
            Err(error) => {
                state.detail_failures += 1;
                log::warn!("Details unavailable for '{}': {}", item.title, error);
                EnrichedRecord::unenriched(item)
            }
        }
    }

    /// Politeness pause before every request except the first of the run.
    async fn pace(&self, state: &mut CrawlState, range: DelayRange) {
        if state.requests > 0 {
            let delay = range.sample(&mut state.rng);
            self.clock.sleep(delay).await;
        }
        state.requests += 1;
    }
}

/// Run the crawler and persist its records.
pub async fn run_crawler(
    config: &Config,
    storage: &dyn RecordStorage,
    clock: Arc<dyn Clock>,
) -> Result<CrawlOutcome> {
    let start_time = Utc::now();
    let crawler = BookCrawler::new(config, clock)?;
    let outcome = crawler.crawl().await;

    let summary = storage.write_records(&outcome.records).await?;
    log::info!(
        "Saved {} rows to {} in {}s",
        summary.row_count,
        summary.location,
        (Utc::now() - start_time).num_seconds()
    );
    if outcome.detail_failures > 0 {
        log::warn!(
            "{} of {} product pages could not be fetched",
            outcome.detail_failures,
            outcome.detail_total
        );
    }

    Ok(outcome)
}
