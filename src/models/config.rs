//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Genre, Selectors};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP behavior: identities, retries, soft-block detection
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Crawl budgets and pacing
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Markup rules for every page type
    #[serde(default)]
    pub selectors: Selectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("fetch.user_agents is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(AppError::validation("fetch.max_attempts must be > 0"));
        }
        self.crawl.page_delay_ms.validate("crawl.page_delay_ms")?;
        self.crawl.detail_delay_ms.validate("crawl.detail_delay_ms")?;
        url::Url::parse(&self.crawl.start_url)?;
        url::Url::parse(&self.crawl.base_url)?;
        if self.selectors.listing.cards.is_empty() {
            return Err(AppError::validation("selectors.listing.cards is empty"));
        }
        if self.selectors.listing.title.is_empty() {
            return Err(AppError::validation("selectors.listing.title is empty"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Pool of User-Agent headers, one picked at random per attempt
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    #[serde(default = "defaults::accept")]
    pub accept: String,

    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Referer sent with every request; omitted when empty
    #[serde(default = "defaults::base_url")]
    pub referer: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// HTTP statuses worth retrying
    #[serde(default = "defaults::retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// Backoff after failed attempt `n` is `base + (n - 1) * step + rand(0..=jitter)` ms
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    #[serde(default = "defaults::backoff_step")]
    pub backoff_step_ms: u64,

    #[serde(default = "defaults::backoff_jitter")]
    pub backoff_jitter_ms: u64,

    /// Case-insensitive phrases that mark a soft-blocked body
    #[serde(default = "defaults::block_markers")]
    pub block_markers: Vec<String>,

    /// Append a throwaway query token to defeat intermediary caches
    #[serde(default = "defaults::enabled")]
    pub cache_buster: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            referer: defaults::base_url(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            retry_statuses: defaults::retry_statuses(),
            backoff_base_ms: defaults::backoff_base(),
            backoff_step_ms: defaults::backoff_step(),
            backoff_jitter_ms: defaults::backoff_jitter(),
            block_markers: defaults::block_markers(),
            cache_buster: defaults::enabled(),
        }
    }
}

/// Crawl budgets, pacing and policy switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Base used to resolve relative links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// First listing page
    #[serde(default = "defaults::start_url")]
    pub start_url: String,

    /// Desired number of records
    #[serde(default = "defaults::limit")]
    pub limit: usize,

    /// Ceiling on listing pages fetched
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Pause before each listing page after the first request
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: DelayRange,

    /// Pause before each product page fetch
    #[serde(default = "defaults::detail_delay")]
    pub detail_delay_ms: DelayRange,

    /// Genre reported when a product page has no breadcrumb trail
    #[serde(default)]
    pub genre_fallback: GenreFallback,

    /// Whether duplicates are skipped before or after their product page is fetched
    #[serde(default)]
    pub dedup_stage: DedupStage,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            start_url: defaults::start_url(),
            limit: defaults::limit(),
            max_pages: defaults::max_pages(),
            page_delay_ms: defaults::page_delay(),
            detail_delay_ms: defaults::detail_delay(),
            genre_fallback: GenreFallback::default(),
            dedup_stage: DedupStage::default(),
        }
    }
}

/// Inclusive range of milliseconds to draw a politeness delay from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min: 0, max: 0 };

    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draw a duration uniformly from the range.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Duration {
        let (lo, hi) = (self.min.min(self.max), self.min.max(self.max));
        Duration::from_millis(rng.u64(lo..=hi))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(AppError::validation(format!(
                "{name}: min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// What to report when the breadcrumb trail is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenreFallback {
    /// Leave the genre empty
    #[default]
    Unknown,
    /// Assume non-fiction
    NonFiction,
}

impl GenreFallback {
    pub fn genre(&self) -> Option<Genre> {
        match self {
            GenreFallback::Unknown => None,
            GenreFallback::NonFiction => Some(Genre::NonFiction),
        }
    }
}

/// When the duplicate check runs relative to the product page fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStage {
    /// Skip duplicates without fetching their product page
    #[default]
    BeforeEnrichment,
    /// Fetch the product page first, then drop the duplicate
    AfterEnrichment,
}

mod defaults {
    use super::DelayRange;

    // Fetch defaults
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.5 Safari/605.1.15".into(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36".into(),
        ]
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn retry_statuses() -> Vec<u16> {
        vec![429, 500, 502, 503, 504]
    }
    pub fn backoff_base() -> u64 {
        2000
    }
    pub fn backoff_step() -> u64 {
        2000
    }
    pub fn backoff_jitter() -> u64 {
        2500
    }
    pub fn block_markers() -> Vec<String> {
        vec![
            "captcha".into(),
            "robot check".into(),
            "make sure you're not a robot".into(),
        ]
    }
    pub fn enabled() -> bool {
        true
    }

    // Crawl defaults
    pub fn base_url() -> String {
        "https://www.amazon.com".into()
    }
    pub fn start_url() -> String {
        "https://www.amazon.com/gp/bestsellers/books".into()
    }
    pub fn limit() -> usize {
        52
    }
    pub fn max_pages() -> usize {
        10
    }
    pub fn page_delay() -> DelayRange {
        DelayRange::new(5000, 9000)
    }
    pub fn detail_delay() -> DelayRange {
        DelayRange::new(2500, 4500)
    }
}
