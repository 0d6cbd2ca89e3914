//! Product page extraction.
//!
//! Reads language and publication year from the product details block and
//! infers the genre from the breadcrumb trail.

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{BookDetails, DetailSelectors, Genre, GenreFallback};
use crate::services::selectors::parse_selector;
use crate::utils::element_text;
use crate::utils::normalize::parse_year;

/// Bidi marks the storefront sprinkles around detail labels.
const INVISIBLE: [char; 3] = ['\u{200e}', '\u{200f}', '\u{feff}'];

/// Turns a product document into [`BookDetails`].
pub struct DetailExtractor {
    breadcrumbs: Selector,
    bullet_rows: Selector,
    bullet_label: Selector,
    span: Selector,
    table_rows: Selector,
    th: Selector,
    td: Selector,
    fiction_token: String,
    language_labels: Vec<String>,
    date_labels: Vec<String>,
    genre_fallback: GenreFallback,
}

/// Raw label matches collected from one layout.
#[derive(Debug, Default)]
struct DetailText {
    language: Option<String>,
    publication: Option<String>,
}

impl DetailText {
    fn is_complete(&self) -> bool {
        self.language.is_some() && self.publication.is_some()
    }
}

impl DetailExtractor {
    pub fn new(selectors: &DetailSelectors, genre_fallback: GenreFallback) -> Result<Self> {
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();

        Ok(Self {
            breadcrumbs: parse_selector(&selectors.breadcrumbs)?,
            bullet_rows: parse_selector(&selectors.bullet_rows)?,
            bullet_label: parse_selector(&selectors.bullet_label)?,
            span: parse_selector("span")?,
            table_rows: parse_selector(&selectors.table_rows)?,
            th: parse_selector("th")?,
            td: parse_selector("td")?,
            fiction_token: selectors.fiction_token.to_lowercase(),
            language_labels: lower(&selectors.language_labels),
            date_labels: lower(&selectors.date_labels),
            genre_fallback,
        })
    }

    pub fn extract(&self, document: &Html) -> BookDetails {
        let mut text = DetailText::default();
        self.scan_bullets(document, &mut text);
        if !text.is_complete() {
            self.scan_table(document, &mut text);
        }

        BookDetails {
            language: text.language,
            publication_year: text.publication.as_deref().and_then(parse_year),
            genre: self.genre(document),
        }
    }

    /// Fiction if any crumb mentions the token, otherwise non-fiction.
    /// Without a trail the configured fallback applies.
    fn genre(&self, document: &Html) -> Option<Genre> {
        let crumbs: Vec<String> = document
            .select(&self.breadcrumbs)
            .map(|a| element_text(&a).to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        if crumbs.is_empty() {
            return self.genre_fallback.genre();
        }
        if crumbs.iter().any(|c| c.contains(&self.fiction_token)) {
            Some(Genre::Fiction)
        } else {
            Some(Genre::NonFiction)
        }
    }

    fn scan_bullets(&self, document: &Html, text: &mut DetailText) {
        for row in document.select(&self.bullet_rows) {
            if let Some((label, value)) = self.bullet_pair(row) {
                self.record(&label, value, text);
            }
        }
    }

    fn bullet_pair(&self, row: ElementRef<'_>) -> Option<(String, String)> {
        if let Some(label_node) = row.select(&self.bullet_label).next() {
            let label_text = element_text(&label_node);
            let full = element_text(&row);
            let value = match full.split_once(':') {
                Some((_, rest)) => rest,
                None => full.strip_prefix(label_text.as_str()).unwrap_or(full.as_str()),
            };
            return Some((clean_label(&label_text), clean_value(value)));
        }

        let spans: Vec<_> = row.select(&self.span).collect();
        if spans.len() < 2 {
            return None;
        }
        let label = clean_label(&element_text(&spans[0]));
        let value = clean_value(&element_text(spans.last()?));
        Some((label, value))
    }

    fn scan_table(&self, document: &Html, text: &mut DetailText) {
        for row in document.select(&self.table_rows) {
            let (Some(th), Some(td)) = (row.select(&self.th).next(), row.select(&self.td).next())
            else {
                continue;
            };
            let label = clean_label(&element_text(&th));
            self.record(&label, clean_value(&element_text(&td)), text);
        }
    }

    /// Store `value` under the first field whose label matches; found values stick.
    fn record(&self, label: &str, value: String, text: &mut DetailText) {
        if value.is_empty() {
            return;
        }
        if text.language.is_none() && self.language_labels.iter().any(|l| label.contains(l)) {
            text.language = Some(value.clone());
        }
        if text.publication.is_none() && self.date_labels.iter().any(|l| label.contains(l)) {
            text.publication = Some(value);
        }
    }
}

fn clean_label(s: &str) -> String {
    s.replace(INVISIBLE, "")
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

fn clean_value(s: &str) -> String {
    s.replace(INVISIBLE, "").trim().to_string()
}
