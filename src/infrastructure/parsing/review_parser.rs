//! Review block parser
//!
//! Failures are isolated per review: a container without a text node is
//! skipped, and a bad rating follows the site's fallback policy.

use super::config::ReviewSelectors;
use super::rating::RatingRule;
use super::selectors::element_text;
use super::{ParsingError, ParsingResult, SelectorList};
use crate::domain::ReviewRecord;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

pub struct ReviewParser {
    container: SelectorList,
    text: SelectorList,
    rating: SelectorList,
    title: SelectorList,
    rating_rule: RatingRule,
}

impl ReviewParser {
    pub fn new(selectors: &ReviewSelectors, rating_rule: RatingRule) -> ParsingResult<Self> {
        if rating_rule.scale_max == 0 {
            return Err(ParsingError::configuration(
                "rating.scale_max",
                "rating scale must be greater than 0",
            ));
        }
        let container = SelectorList::compile(&selectors.container)?;
        if container.is_empty() {
            return Err(ParsingError::configuration(
                "reviews.container",
                "at least one review container selector is required",
            ));
        }
        Ok(Self {
            container,
            text: SelectorList::compile(&selectors.text)?,
            rating: SelectorList::compile(&selectors.rating)?,
            title: SelectorList::compile(&selectors.title)?,
            rating_rule,
        })
    }

    pub fn parse_reviews(&self, html: &Html) -> Vec<ReviewRecord> {
        let containers = self.container.select_document(html);
        let reviews: Vec<ReviewRecord> = containers
            .iter()
            .enumerate()
            .filter_map(|(index, container)| self.parse_one(index, container))
            .collect();

        debug!(
            "Extracted {} of {} review blocks",
            reviews.len(),
            containers.len()
        );
        reviews
    }

    fn parse_one(&self, index: usize, container: &ElementRef) -> Option<ReviewRecord> {
        let Some(text_element) = self.text.first_in(container) else {
            debug!("Review block {} has no text node, skipping", index);
            return None;
        };
        let text = self.strip_title(container, element_text(&text_element));

        let decoded = self.decode_rating(container);
        if let Err(e) = &decoded {
            warn!("Review block {}: {}", index, e);
        }
        let Some(rating) = self.rating_rule.resolve(decoded.ok()) else {
            debug!("Review block {} dropped for its rating", index);
            return None;
        };

        Some(ReviewRecord::new(text, rating))
    }

    fn decode_rating(&self, container: &ElementRef) -> ParsingResult<u8> {
        if self.rating.is_empty() {
            return self.rating_rule.decode(container);
        }
        let element = self
            .rating
            .first_in(container)
            .ok_or_else(|| ParsingError::required_field_missing("rating", Some("review block")))?;
        self.rating_rule.decode(&element)
    }

    fn strip_title(&self, container: &ElementRef, text: String) -> String {
        let Some(title) = self.title.text_in(container) else {
            return text;
        };
        match text.strip_prefix(title.as_str()) {
            Some(rest) => rest.trim_start().to_string(),
            None => text,
        }
    }
}
