//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Page fetching with retry and soft-block detection (`FetchClient`)
//! - Listing card extraction (`ListingExtractor`)
//! - Product page enrichment (`DetailExtractor`)
//! - Next-page discovery (`PaginationNavigator`)

mod details;
mod fetcher;
mod listing;
mod pagination;
pub mod selectors;

pub use details::DetailExtractor;
pub use fetcher::{FetchClient, Page};
pub use listing::ListingExtractor;
pub use pagination::PaginationNavigator;
