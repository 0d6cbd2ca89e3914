// src/utils/normalize.rs

//! Text to value converters used by the extractors.
//!
//! None of these fail: text that does not parse yields `None`.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;

static RATING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9.]+)\s+out of 5").unwrap());
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$£€]\s*([0-9]+(?:\.[0-9]+)?)").unwrap());
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((.*?)\)").unwrap());
static LOOSE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

/// Earliest plausible publication year.
pub const MIN_YEAR: i32 = 1400;

/// Keep only the digits of `text`, e.g. `"(12,345)"` becomes `12345`.
pub fn clean_int(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parse a `"<number> out of 5"` phrase.
pub fn parse_rating(text: &str) -> Option<f64> {
    let caps = RATING.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    (0.0..=5.0).contains(&value).then_some(value)
}

/// Parse the first currency amount, ignoring thousands separators.
pub fn parse_price(text: &str) -> Option<f64> {
    let stripped = text.replace(',', "");
    let caps = PRICE.captures(&stripped)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Extract a publication year from free-form date text.
///
/// A parenthesized part is preferred when present, then exact formats are
/// tried (`September 25, 2025`, `September 2025`, `2025`), then any 19xx/20xx.
pub fn parse_year(text: &str) -> Option<i32> {
    parse_year_until(text, Utc::now().year() + 1)
}

/// [`parse_year`] with an explicit upper bound on the accepted year.
pub fn parse_year_until(text: &str, max_year: i32) -> Option<i32> {
    let mut s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = PARENTHESIZED.captures(s).and_then(|c| c.get(1)) {
        s = inner.as_str().trim();
    }

    let plausible = |year: &i32| (MIN_YEAR..=max_year).contains(year);
    exact_year(s).filter(plausible).or_else(|| {
        LOOSE_YEAR
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .filter(plausible)
    })
}

fn exact_year(s: &str) -> Option<i32> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%B %d, %Y") {
        return Some(date.year());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{s} 1"), "%B %Y %d") {
        return Some(date.year());
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }
    None
}
