//! Next-page discovery for listing pages.
//!
//! Pagination widgets also link back to earlier pages, so a candidate only
//! counts when it points past the current page number.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::PaginationSelectors;
use crate::services::selectors::CompiledRule;
use crate::utils::resolve_url;

static PATH_PAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"zg_bs_pg_(\d+)").unwrap());

/// Finds the address of the following listing page.
pub struct PaginationNavigator {
    rules: Vec<CompiledRule>,
}

impl PaginationNavigator {
    pub fn new(selectors: &PaginationSelectors) -> Result<Self> {
        Ok(Self {
            rules: CompiledRule::compile_all(&selectors.next)?,
        })
    }

    /// Absolute URL of the next page, or `None` when this is the last one.
    ///
    /// Rules are tried in priority order. Within a rule, links to the current
    /// or an earlier page are skipped; among numbered candidates the lowest
    /// page wins, otherwise the first in document order.
    pub fn next_url(&self, document: &Html, page_url: &Url) -> Option<String> {
        let current = page_number(page_url).unwrap_or(1);
        let root = document.root_element();

        self.rules.iter().find_map(|rule| {
            let candidates: Vec<(Option<u32>, String)> = rule
                .values(root)
                .iter()
                .map(|href| resolve_url(page_url, href))
                .filter(|url| url != page_url.as_str())
                .map(|url| (Url::parse(&url).ok().and_then(|u| page_number(&u)), url))
                .filter(|(page, _)| page.is_none_or(|n| n > current))
                .collect();

            candidates
                .iter()
                .filter(|(page, _)| page.is_some())
                .min_by_key(|(page, _)| *page)
                .or_else(|| candidates.first())
                .map(|(_, url)| url.clone())
        })
    }
}

/// Listing page number carried by `url`: the `pg` query parameter, else a
/// `zg_bs_pg_<n>` path marker.
fn page_number(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "pg")
        .and_then(|(_, value)| value.parse().ok())
        .or_else(|| {
            PATH_PAGE
                .captures(url.path())
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
}
