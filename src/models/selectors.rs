// src/models/selectors.rs

//! CSS selector rules for the listing, product and pagination layouts.
//!
//! Every list here is ordered by priority. The storefront rotates between
//! several markup variants, so each piece of data gets a chain of rules and
//! the first one that produces something wins.

use serde::{Deserialize, Serialize};

/// A named selector that locates listing cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardPattern {
    /// Pattern name for identification in logs
    pub name: String,

    /// CSS selector matching one element per card
    pub selector: String,
}

impl CardPattern {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

/// A single rule for reading a value out of a fragment.
///
/// Reads the attribute `attr` of the first matching element when set,
/// otherwise its whitespace-normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl FieldRule {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: None,
        }
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attr: Some(attr.into()),
        }
    }
}

/// Selectors for the best-seller listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    #[serde(default = "defaults::cards")]
    pub cards: Vec<CardPattern>,

    #[serde(default = "defaults::title")]
    pub title: Vec<FieldRule>,

    #[serde(default = "defaults::author")]
    pub author: Vec<FieldRule>,

    #[serde(default = "defaults::rating")]
    pub rating: Vec<FieldRule>,

    #[serde(default = "defaults::reviews")]
    pub reviews: Vec<FieldRule>,

    #[serde(default = "defaults::price")]
    pub price: Vec<FieldRule>,

    #[serde(default = "defaults::link")]
    pub link: Vec<FieldRule>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            cards: defaults::cards(),
            title: defaults::title(),
            author: defaults::author(),
            rating: defaults::rating(),
            reviews: defaults::reviews(),
            price: defaults::price(),
            link: defaults::link(),
        }
    }
}

/// Selectors for the product (detail) page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// Links of the category breadcrumb trail
    #[serde(default = "defaults::breadcrumbs")]
    pub breadcrumbs: String,

    /// Rows of the bullet-list product details layout
    #[serde(default = "defaults::bullet_rows")]
    pub bullet_rows: String,

    /// Bold label inside a bullet row
    #[serde(default = "defaults::bullet_label")]
    pub bullet_label: String,

    /// Rows of the legacy product details table
    #[serde(default = "defaults::table_rows")]
    pub table_rows: String,

    /// Token in a breadcrumb that marks fiction
    #[serde(default = "defaults::fiction_token")]
    pub fiction_token: String,

    /// Label fragments identifying the language row
    #[serde(default = "defaults::language_labels")]
    pub language_labels: Vec<String>,

    /// Label fragments identifying the publication date row
    #[serde(default = "defaults::date_labels")]
    pub date_labels: Vec<String>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            breadcrumbs: defaults::breadcrumbs(),
            bullet_rows: defaults::bullet_rows(),
            bullet_label: defaults::bullet_label(),
            table_rows: defaults::table_rows(),
            fiction_token: defaults::fiction_token(),
            language_labels: defaults::language_labels(),
            date_labels: defaults::date_labels(),
        }
    }
}

/// Rules for finding the next listing page, highest priority first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSelectors {
    #[serde(default = "defaults::next")]
    pub next: Vec<FieldRule>,
}

impl Default for PaginationSelectors {
    fn default() -> Self {
        Self {
            next: defaults::next(),
        }
    }
}

/// All selector groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default)]
    pub listing: ListingSelectors,

    #[serde(default)]
    pub detail: DetailSelectors,

    #[serde(default)]
    pub pagination: PaginationSelectors,
}

mod defaults {
    use super::{CardPattern, FieldRule};

    // Listing layouts, newest first
    pub fn cards() -> Vec<CardPattern> {
        vec![
            CardPattern::new("grid_faceout", "div.zg-grid-general-faceout"),
            CardPattern::new("uncoverable_faceout", "div.p13n-sc-uncoverable-faceout"),
            CardPattern::new("grid_row", "div._cDEzb_grid-row_3Cywl > div"),
            CardPattern::new("uncoverable_card", "div._cDEzb_p13n-sc-uncoverable-card_3Xk2N"),
            CardPattern::new("legacy_faceout", "div.p13n-sc-uncoverable-faceout-legacy"),
        ]
    }
    pub fn title() -> Vec<FieldRule> {
        vec![
            FieldRule::text("a.a-link-normal > span"),
            FieldRule::text("div.p13n-sc-truncate"),
            FieldRule::attr("img[alt]", "alt"),
        ]
    }
    pub fn author() -> Vec<FieldRule> {
        vec![
            FieldRule::text(".a-color-secondary .a-size-small"),
            FieldRule::text(".a-row.a-size-small"),
        ]
    }
    pub fn rating() -> Vec<FieldRule> {
        vec![FieldRule::text("span.a-icon-alt")]
    }
    pub fn reviews() -> Vec<FieldRule> {
        vec![FieldRule::text("span.a-size-small.a-link-normal")]
    }
    pub fn price() -> Vec<FieldRule> {
        vec![
            FieldRule::text("span.a-price > span.a-offscreen"),
            FieldRule::text(".p13n-sc-price"),
            FieldRule::text("span.a-color-price"),
        ]
    }
    pub fn link() -> Vec<FieldRule> {
        vec![FieldRule::attr("a.a-link-normal", "href")]
    }

    // Product page
    pub fn breadcrumbs() -> String {
        "#wayfinding-breadcrumbs_feature_div a".into()
    }
    pub fn bullet_rows() -> String {
        "#detailBullets_feature_div li".into()
    }
    pub fn bullet_label() -> String {
        "span.a-text-bold".into()
    }
    pub fn table_rows() -> String {
        "#productDetailsTable tr".into()
    }
    pub fn fiction_token() -> String {
        "fiction".into()
    }
    pub fn language_labels() -> Vec<String> {
        vec!["language".into()]
    }
    pub fn date_labels() -> Vec<String> {
        vec!["publication date".into(), "publisher".into()]
    }

    // Pagination
    pub fn next() -> Vec<FieldRule> {
        vec![
            FieldRule::attr("ul.a-pagination li.a-last a", "href"),
            FieldRule::attr(r#"a[href*="?pg="]"#, "href"),
            FieldRule::attr(r#"a[href*="zg_bs_pg_"]"#, "href"),
            FieldRule::attr(r#"link[rel="next"]"#, "href"),
        ]
    }
}
