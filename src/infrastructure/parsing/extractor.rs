//! Record extractor: one entry point over the catalog, item and review parsers

use super::catalog_parser::CatalogParser;
use super::item_parser::ItemParser;
use super::review_parser::ReviewParser;
use super::{ContextualParser, PageContext, ParsingResult};
use crate::domain::{ItemId, ItemRecord, ReviewRecord};
use crate::infrastructure::site_profiles::SiteProfile;
use scraper::Html;

/// Item metadata plus the reviews on one rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub item: ItemRecord,
    pub reviews: Vec<ReviewRecord>,
}

/// Turns rendered markup into typed records.
///
/// Selectors are compiled once, so an invalid profile fails here rather
/// than halfway through a crawl.
pub struct RecordExtractor {
    catalog: CatalogParser,
    item: ItemParser,
    reviews: ReviewParser,
}

impl RecordExtractor {
    pub fn from_profile(profile: &SiteProfile) -> ParsingResult<Self> {
        Ok(Self {
            catalog: CatalogParser::new(&profile.catalog)?,
            item: ItemParser::new(&profile.item, &profile.gate)?,
            reviews: ReviewParser::new(&profile.reviews, profile.rating.clone())?,
        })
    }

    pub fn extract(&self, markup: &str) -> Extraction {
        let html = Html::parse_document(markup);
        Extraction {
            item: self.item.parse_item(&html),
            reviews: self.reviews.parse_reviews(&html),
        }
    }

    pub fn extract_item(&self, markup: &str) -> ItemRecord {
        self.item.parse_item(&Html::parse_document(markup))
    }

    pub fn extract_reviews(&self, markup: &str) -> Vec<ReviewRecord> {
        self.reviews.parse_reviews(&Html::parse_document(markup))
    }

    pub fn extract_item_links(&self, markup: &str, context: &PageContext) -> ParsingResult<Vec<ItemId>> {
        self.catalog
            .parse_with_context(&Html::parse_document(markup), context)
    }

    pub fn extract_reviews_link(&self, markup: &str, context: &PageContext) -> Option<String> {
        if !self.item.has_reviews_link() {
            return None;
        }
        self.item.reviews_link(&Html::parse_document(markup), context)
    }

    pub fn extract_review_count(&self, markup: &str) -> Option<u32> {
        self.item.review_count(&Html::parse_document(markup))
    }

    pub fn uses_reviews_page(&self) -> bool {
        self.item.has_reviews_link()
    }
}
