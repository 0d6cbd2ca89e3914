//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Crawl listing pages, enrich each book, persist the records

pub mod crawl;

pub use crawl::{BookCrawler, CrawlOutcome, StopReason, run_crawler};
