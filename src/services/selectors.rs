//! Compiled selector rules and first-match evaluation.
//!
//! Rules are parsed once when a service is built, then applied to many
//! documents. Every rule has the same shape so a chain of them is just an
//! ordered slice evaluated with short-circuit on the first hit.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CardPattern, FieldRule};
use crate::utils::element_text;

/// Parse a CSS selector, mapping failures to a typed error.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// A ready-to-use [`FieldRule`].
#[derive(Debug, Clone)]
pub struct CompiledRule {
    selector: Selector,
    attr: Option<String>,
}

impl CompiledRule {
    pub fn compile(rule: &FieldRule) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(&rule.selector)?,
            attr: rule.attr.clone(),
        })
    }

    pub fn compile_all(rules: &[FieldRule]) -> Result<Vec<Self>> {
        rules.iter().map(Self::compile).collect()
    }

    /// First non-empty value this rule reads inside `scope`.
    pub fn resolve(&self, scope: ElementRef<'_>) -> Option<String> {
        scope.select(&self.selector).find_map(|el| self.read(el))
    }

    /// Every non-empty value this rule reads inside `scope`, in document order.
    pub fn values(&self, scope: ElementRef<'_>) -> Vec<String> {
        scope
            .select(&self.selector)
            .filter_map(|el| self.read(el))
            .collect()
    }

    fn read(&self, el: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => el.value().attr(attr)?.trim().to_string(),
            None => element_text(&el),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Evaluate a rule chain in priority order; the first rule with a value wins.
pub fn first_match(rules: &[CompiledRule], scope: ElementRef<'_>) -> Option<String> {
    rules.iter().find_map(|rule| rule.resolve(scope))
}

/// A ready-to-use [`CardPattern`].
#[derive(Debug, Clone)]
pub struct CardLocator {
    name: String,
    selector: Selector,
}

impl CardLocator {
    pub fn compile(pattern: &CardPattern) -> Result<Self> {
        Ok(Self {
            name: pattern.name.clone(),
            selector: parse_selector(&pattern.selector)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All cards this layout finds, in document order.
    pub fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.selector).collect()
    }
}

/// Try layouts in priority order and keep the first that finds any card.
pub fn detect_cards<'a, 'l>(
    locators: &'l [CardLocator],
    document: &'a Html,
) -> Option<(&'l CardLocator, Vec<ElementRef<'a>>)> {
    locators.iter().find_map(|locator| {
        let cards = locator.locate(document);
        if cards.is_empty() {
            None
        } else {
            log::debug!("Detected listing layout: '{}'", locator.name);
            Some((locator, cards))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("div.class").is_ok());
        assert!(parse_selector(r#"a[href*="?pg="]"#).is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(matches!(
            parse_selector("[[invalid"),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn test_rule_reads_text_or_attr() {
        let html = doc(r#"<div><img alt=" Cover Title " src="x.jpg"><span> Some  text </span></div>"#);
        let root = html.root_element();

        let text = CompiledRule::compile(&FieldRule::text("span")).unwrap();
        let alt = CompiledRule::compile(&FieldRule::attr("img[alt]", "alt")).unwrap();

        assert_eq!(text.resolve(root), Some("Some text".to_string()));
        assert_eq!(alt.resolve(root), Some("Cover Title".to_string()));
    }

    #[test]
    fn test_rule_skips_empty_matches() {
        let html = doc("<p><span> </span><span>second</span></p>");
        let rule = CompiledRule::compile(&FieldRule::text("span")).unwrap();
        assert_eq!(rule.resolve(html.root_element()), Some("second".to_string()));
    }

    #[test]
    fn test_values_keeps_document_order() {
        let html = doc(r#"<a href="/3">c</a><a>no href</a><a href="/1">a</a>"#);
        let rule = CompiledRule::compile(&FieldRule::attr("a", "href")).unwrap();
        assert_eq!(rule.values(html.root_element()), vec!["/3", "/1"]);
    }

    #[test]
    fn test_first_match_respects_priority() {
        let html = doc(r#"<div><b>low</b><i>high</i></div>"#);
        let rules = CompiledRule::compile_all(&[
            FieldRule::text("u"),
            FieldRule::text("i"),
            FieldRule::text("b"),
        ])
        .unwrap();

        assert_eq!(first_match(&rules, html.root_element()), Some("high".to_string()));
        assert_eq!(first_match(&rules[..1], html.root_element()), None);
    }

    #[test]
    fn test_detect_cards_stops_at_first_hit() {
        let html = doc(r#"<div class="b">1</div><div class="b">2</div><div class="c">3</div>"#);
        let locators = [
            CardLocator::compile(&CardPattern::new("a", "div.a")).unwrap(),
            CardLocator::compile(&CardPattern::new("b", "div.b")).unwrap(),
            CardLocator::compile(&CardPattern::new("c", "div.c")).unwrap(),
        ];

        let (winner, cards) = detect_cards(&locators, &html).unwrap();
        assert_eq!(winner.name(), "b");
        assert_eq!(cards.len(), 2);
    }
}
