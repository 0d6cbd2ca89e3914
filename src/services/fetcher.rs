//! Resilient page fetcher.
//!
//! Each attempt sends a randomly chosen identity, a cache-defeating query
//! token and browser-like headers. Transport failures, transient statuses
//! and soft-blocked bodies are retried with growing, jittered backoff until
//! the attempt budget is spent.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT};

use crate::error::{AppError, FetchFailure, Result};
use crate::models::FetchConfig;
use crate::utils::{Clock, with_cache_token};

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct Page {
    /// The requested URL, without the cache token
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// HTTP client with retry, header rotation and soft-block detection.
pub struct FetchClient {
    client: Client,
    config: FetchConfig,
    block_markers: Vec<String>,
    clock: Arc<dyn Clock>,
    seed: u64,
    requests: AtomicU64,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: &FetchConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        let seed = clock.now().timestamp_micros() as u64;

        Ok(Self {
            client,
            config: config.clone(),
            block_markers: config
                .block_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            clock,
            seed,
            requests: AtomicU64::new(0),
        })
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// Returns [`AppError::Fetch`] carrying the last cause once the attempt
    /// budget is spent, or immediately for a non-retryable status.
    pub async fn fetch(&self, url: &str) -> Result<Page> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let mut rng = self.next_rng();
            let failure = match self.attempt(url, &mut rng).await {
                Ok(page) => {
                    log::debug!("Fetched {} (attempt {})", url, attempt);
                    return Ok(page);
                }
                Err(failure) => failure,
            };

            if attempt >= max_attempts || !failure.is_retryable(&self.config.retry_statuses) {
                return Err(AppError::fetch(url, attempt, failure));
            }

            let delay = self.backoff(attempt, &mut rng);
            log::warn!(
                "Attempt {}/{} for {} failed ({}); retrying in {:.1}s",
                attempt,
                max_attempts,
                url,
                failure,
                delay.as_secs_f64()
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Number of HTTP requests sent so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    async fn attempt(
        &self,
        url: &str,
        rng: &mut fastrand::Rng,
    ) -> std::result::Result<Page, FetchFailure> {
        let target = if self.config.cache_buster {
            let token = format!(
                "{}{}",
                self.clock.now().timestamp_millis(),
                rng.u32(100..1000)
            );
            with_cache_token(url, &token)
        } else {
            url.to_string()
        };

        let mut request = self
            .client
            .get(&target)
            .header(ACCEPT, &self.config.accept)
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(agent) = self.pick_user_agent(rng) {
            request = request.header(USER_AGENT, agent);
        }
        if !self.config.referer.is_empty() {
            request = request.header(REFERER, &self.config.referer);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        if let Some(marker) = self.block_marker(&body) {
            return Err(FetchFailure::SoftBlock(marker.to_string()));
        }

        Ok(Page {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Delay before the retry that follows attempt `attempt` (1-based).
    fn backoff(&self, attempt: u32, rng: &mut fastrand::Rng) -> Duration {
        let step = self
            .config
            .backoff_step_ms
            .saturating_mul(u64::from(attempt - 1));
        let jitter = rng.u64(0..=self.config.backoff_jitter_ms);
        Duration::from_millis(
            self.config
                .backoff_base_ms
                .saturating_add(step)
                .saturating_add(jitter),
        )
    }

    fn block_marker(&self, body: &str) -> Option<&str> {
        let lower = body.to_lowercase();
        self.block_markers
            .iter()
            .find(|marker| !marker.is_empty() && lower.contains(marker.as_str()))
            .map(String::as_str)
    }

    fn pick_user_agent(&self, rng: &mut fastrand::Rng) -> Option<&str> {
        let agents = &self.config.user_agents;
        if agents.is_empty() {
            return None;
        }
        Some(agents[rng.usize(..agents.len())].as_str())
    }

    fn next_rng(&self) -> fastrand::Rng {
        let n = self.requests.fetch_add(1, Ordering::Relaxed);
        fastrand::Rng::with_seed(self.seed ^ n.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

fn classify(error: reqwest::Error) -> FetchFailure {
    if error.is_builder() {
        FetchFailure::InvalidRequest(error.to_string())
    } else if error.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Network(error.to_string())
    }
}
