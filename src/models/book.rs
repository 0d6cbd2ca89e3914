//! Book record data structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One card from a listing page, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Book title (never empty)
    pub title: String,

    /// Author or contributor line as shown on the card
    pub author: Option<String>,

    /// Average star rating in `[0, 5]`
    pub rating: Option<f64>,

    /// Number of customer reviews
    pub review_count: Option<u64>,

    /// Listed price
    pub price: Option<f64>,

    /// Absolute URL of the product page
    pub detail_url: Option<String>,
}

impl ListingItem {
    /// Create an item with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            rating: None,
            review_count: None,
            price: None,
            detail_url: None,
        }
    }

    /// Key identifying this book within one crawl.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.title, self.author.as_deref())
    }
}

/// Broad category inferred from the product breadcrumb trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-fiction")]
    NonFiction,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-fiction",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields read from a product page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDetails {
    pub language: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<Genre>,
}

/// A listing item merged with its product-page details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub title: String,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub price: Option<f64>,
    pub detail_url: Option<String>,
    pub language: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<Genre>,
}

impl EnrichedRecord {
    /// Merge a listing item with (possibly empty) details.
    pub fn merge(item: ListingItem, details: BookDetails) -> Self {
        Self {
            title: item.title,
            author: item.author,
            rating: item.rating,
            review_count: item.review_count,
            price: item.price,
            detail_url: item.detail_url,
            language: details.language,
            publication_year: details.publication_year,
            genre: details.genre,
        }
    }

    /// A record whose enrichment was skipped or failed.
    pub fn unenriched(item: ListingItem) -> Self {
        Self::merge(item, BookDetails::default())
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.title, self.author.as_deref())
    }
}

/// Case- and whitespace-normalized `(title, author)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    title: String,
    author: String,
}

impl DedupKey {
    pub fn new(title: &str, author: Option<&str>) -> Self {
        Self {
            title: normalize(title),
            author: author.map(normalize).unwrap_or_default(),
        }
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
