//! Item page parser: name, description, review counter and reviews link

use super::config::{ItemSelectors, ReviewGate};
use super::{PageContext, ParsingResult, SelectorList};
use crate::domain::{ItemRecord, NOT_FOUND};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

static COUNT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d\s\u{a0}\u{202f}]*").expect("static regex"));

pub struct ItemParser {
    name: SelectorList,
    description: SelectorList,
    review_count: SelectorList,
    reviews_link: SelectorList,
}

impl ItemParser {
    pub fn new(item: &ItemSelectors, gate: &ReviewGate) -> ParsingResult<Self> {
        Ok(Self {
            name: SelectorList::compile(&item.name)?,
            description: SelectorList::compile(&item.description)?,
            review_count: SelectorList::compile(&gate.review_count)?,
            reviews_link: SelectorList::compile(&gate.reviews_link)?,
        })
    }

    /// Never fails; missing fields become the sentinel.
    pub fn parse_item(&self, html: &Html) -> ItemRecord {
        let name = self.name.text_in_document(html).unwrap_or_else(|| {
            warn!("Item name not found, tried {:?}", self.name.sources());
            NOT_FOUND.to_string()
        });
        let description = self.description.text_in_document(html).unwrap_or_else(|| {
            warn!("Item description not found, tried {:?}", self.description.sources());
            NOT_FOUND.to_string()
        });
        ItemRecord::new(name, description)
    }

    /// `None` when no counter is configured or it holds no number.
    pub fn review_count(&self, html: &Html) -> Option<u32> {
        if self.review_count.is_empty() {
            return None;
        }
        let text = self.review_count.text_in_document(html)?;
        let count = parse_count(&text);
        if count.is_none() {
            debug!("Review counter '{}' holds no number", text);
        }
        count
    }

    pub fn has_reviews_link(&self) -> bool {
        !self.reviews_link.is_empty()
    }

    /// Absolute URL of the dedicated reviews page, if the item links one.
    pub fn reviews_link(&self, html: &Html, context: &PageContext) -> Option<String> {
        let href = self.reviews_link.attr_in_document(html, "href")?;
        match Url::parse(&context.page_url).and_then(|base| base.join(href.trim())) {
            Ok(url) => Some(url.into()),
            Err(e) => {
                warn!("Reviews link '{}' could not be resolved: {}", href, e);
                None
            }
        }
    }
}

/// First number in `text`, tolerating digit-group spaces ("1 234").
pub fn parse_count(text: &str) -> Option<u32> {
    let digits: String = COUNT_DIGITS
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
