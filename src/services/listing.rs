//! Listing page extraction.
//!
//! Locates the cards of one best-seller page and reads each card's fields
//! through its own rule chain.

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::Result;
use crate::models::{ListingItem, ListingSelectors};
use crate::services::selectors::{CardLocator, CompiledRule, detect_cards, first_match};
use crate::utils::normalize::{clean_int, parse_price, parse_rating};
use crate::utils::resolve_url;

/// Turns a listing document into items in displayed rank order.
pub struct ListingExtractor {
    cards: Vec<CardLocator>,
    title: Vec<CompiledRule>,
    author: Vec<CompiledRule>,
    rating: Vec<CompiledRule>,
    reviews: Vec<CompiledRule>,
    price: Vec<CompiledRule>,
    link: Vec<CompiledRule>,
}

impl ListingExtractor {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            cards: selectors
                .cards
                .iter()
                .map(CardLocator::compile)
                .collect::<Result<_>>()?,
            title: CompiledRule::compile_all(&selectors.title)?,
            author: CompiledRule::compile_all(&selectors.author)?,
            rating: CompiledRule::compile_all(&selectors.rating)?,
            reviews: CompiledRule::compile_all(&selectors.reviews)?,
            price: CompiledRule::compile_all(&selectors.price)?,
            link: CompiledRule::compile_all(&selectors.link)?,
        })
    }

    /// Extract all items from `document`; relative links resolve against `page_url`.
    ///
    /// Cards without a title are dropped.
    pub fn extract(&self, document: &Html, page_url: &Url) -> Vec<ListingItem> {
        let Some((layout, cards)) = detect_cards(&self.cards, document) else {
            log::warn!("No listing layout matched {}", page_url);
            return Vec::new();
        };

        let total = cards.len();
        let items: Vec<ListingItem> = cards
            .into_iter()
            .filter_map(|card| self.parse_card(card, page_url))
            .collect();

        if items.len() < total {
            log::debug!(
                "Layout '{}': dropped {} of {} cards without a title",
                layout.name(),
                total - items.len(),
                total
            );
        }
        items
    }

    fn parse_card(&self, card: ElementRef<'_>, page_url: &Url) -> Option<ListingItem> {
        let title = first_match(&self.title, card)?;

        Some(ListingItem {
            title,
            author: first_match(&self.author, card),
            rating: first_match(&self.rating, card).and_then(|t| parse_rating(&t)),
            review_count: first_match(&self.reviews, card).and_then(|t| clean_int(&t)),
            price: first_match(&self.price, card).and_then(|t| parse_price(&t)),
            detail_url: first_match(&self.link, card).map(|href| resolve_url(page_url, &href)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ListingExtractor {
        ListingExtractor::new(&ListingSelectors::default()).unwrap()
    }

    fn page_url() -> Url {
        Url::parse("https://www.amazon.com/gp/bestsellers/books").unwrap()
    }

    const GRID_PAGE: &str = r#"
    <html><body>
      <div class="zg-grid-general-faceout">
        <a class="a-link-normal" href="/Women-Novel-Kristin-Hannah/dp/1250178630"><span>The Women: A Novel</span></a>
        <div class="a-row a-size-small"><div class="_cDEzb_p13n-sc-css-line-clamp-1_1Fn1y">Kristin Hannah</div></div>
        <div class="a-icon-row"><a class="a-link-normal" href="/product-reviews/1250178630">
          <i class="a-icon a-icon-star-small"><span class="a-icon-alt">4.7 out of 5 stars</span></i>
          <span class="a-size-small">128,402</span></a></div>
        <span class="a-size-small a-link-normal">128,402</span>
        <span class="a-price"><span class="a-offscreen">$16.80</span></span>
      </div>
      <div class="zg-grid-general-faceout">
        <img alt="Decorative banner" src="b.png">
      </div>
      <div class="zg-grid-general-faceout">
        <a class="a-link-normal" href="https://www.amazon.com/dp/0593655036"><span>  Atomic   Habits </span></a>
        <span class="a-icon-alt">New</span>
        <span class="p13n-sc-price">Free</span>
      </div>
    </body></html>
    "#;

    #[test]
    fn test_extracts_fields_in_document_order() {
        let doc = Html::parse_document(GRID_PAGE);
        let items = extractor().extract(&doc, &page_url());

        // The banner card has an alt-text title, so it survives
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.title, "The Women: A Novel");
        assert_eq!(first.author.as_deref(), Some("Kristin Hannah"));
        assert_eq!(first.rating, Some(4.7));
        assert_eq!(first.review_count, Some(128402));
        assert_eq!(first.price, Some(16.80));
        assert_eq!(
            first.detail_url.as_deref(),
            Some("https://www.amazon.com/Women-Novel-Kristin-Hannah/dp/1250178630")
        );

        assert_eq!(items[1].title, "Decorative banner");
        assert_eq!(items[1].detail_url, None);

        let third = &items[2];
        assert_eq!(third.title, "Atomic Habits");
        assert_eq!(third.rating, None);
        assert_eq!(third.price, None);
        assert_eq!(third.author, None);
    }

    #[test]
    fn test_card_without_title_is_dropped() {
        let doc = Html::parse_document(
            r#"<div class="zg-grid-general-faceout"><span class="a-icon-alt">4.0 out of 5 stars</span></div>
               <div class="zg-grid-general-faceout"><div class="p13n-sc-truncate">Only Title</div></div>"#,
        );
        let items = extractor().extract(&doc, &page_url());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Only Title");
    }

    #[test]
    fn test_second_layout_used_when_first_absent() {
        let doc = Html::parse_document(
            r#"<div class="p13n-sc-uncoverable-faceout"><div class="p13n-sc-truncate">From Faceout</div></div>
               <div class="p13n-sc-uncoverable-faceout-legacy"><div class="p13n-sc-truncate">From Legacy</div></div>"#,
        );
        let items = extractor().extract(&doc, &page_url());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "From Faceout");
    }

    #[test]
    fn test_unknown_layout_yields_nothing() {
        let doc = Html::parse_document("<ul><li>nothing here</li></ul>");
        assert!(extractor().extract(&doc, &page_url()).is_empty());
    }
}
