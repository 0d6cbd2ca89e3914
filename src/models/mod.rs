// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod book;
mod config;
mod selectors;

// Re-export all public types
pub use book::{BookDetails, DedupKey, EnrichedRecord, Genre, ListingItem};
pub use config::{Config, CrawlConfig, DedupStage, DelayRange, FetchConfig, GenreFallback};
pub use selectors::{
    CardPattern, DetailSelectors, FieldRule, ListingSelectors, PaginationSelectors, Selectors,
};
