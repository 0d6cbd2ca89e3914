//! Storage abstractions for record persistence.
//!
//! The crawl hands its final records to a [`RecordStorage`]. The only
//! backend is a CSV file that is rewritten on every run.

pub mod csv;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::EnrichedRecord;

// Re-export for convenience
pub use self::csv::{COLUMNS, CsvStorage};

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Number of data rows written (header excluded)
    pub row_count: usize,
    /// Where the rows ended up
    pub location: String,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for record storage backends.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Replace any previous output with `records`, keeping their order.
    async fn write_records(&self, records: &[EnrichedRecord]) -> Result<WriteSummary>;
}
