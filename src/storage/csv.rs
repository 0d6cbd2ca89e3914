//! CSV file storage.
//!
//! ## Layout
//!
//! ```text
//! Title,Author,Rating,Reviews,Language,Price,Publication Year,Genre
//! The Women: A Novel,Kristin Hannah,4.7,128402,English,16.80,2024,Fiction
//! ```
//!
//! Absent values are written as empty cells. The file is written to a
//! temporary sibling and renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::EnrichedRecord;
use crate::storage::{RecordStorage, WriteSummary};

/// Output column order.
pub const COLUMNS: [&str; 8] = [
    "Title",
    "Author",
    "Rating",
    "Reviews",
    "Language",
    "Price",
    "Publication Year",
    "Genre",
];

/// CSV file backend.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    path: PathBuf,
}

impl CsvStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render records as CSV bytes, header first.
    pub fn render(records: &[EnrichedRecord]) -> Result<Vec<u8>> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(COLUMNS)?;
        for record in records {
            writer.write_record(Self::row(record))?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }

    fn row(record: &EnrichedRecord) -> [String; 8] {
        [
            record.title.clone(),
            record.author.clone().unwrap_or_default(),
            record.rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
            cell(record.review_count),
            record.language.clone().unwrap_or_default(),
            record.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
            cell(record.publication_year),
            cell(record.genre),
        ]
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[async_trait]
impl RecordStorage for CsvStorage {
    async fn write_records(&self, records: &[EnrichedRecord]) -> Result<WriteSummary> {
        let bytes = Self::render(records)?;
        self.write_bytes(&bytes).await?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(WriteSummary {
            row_count: records.len(),
            location: self.path.display().to_string(),
            timestamp: Utc::now(),
        })
    }
}
