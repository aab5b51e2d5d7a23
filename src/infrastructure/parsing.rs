//! HTML extraction for catalog, item and review pages
//!
//! Parsers are built from a site profile's selector lists and work on
//! already-rendered markup; they never talk to the browser.

pub mod catalog_parser;
pub mod config;
pub mod context;
pub mod error;
pub mod extractor;
pub mod item_parser;
pub mod rating;
pub mod review_parser;
pub mod selectors;

pub use catalog_parser::CatalogParser;
pub use config::{
    CatalogSelectors, ItemSelectors, NormalizerRules, ReviewGate, ReviewPagination,
    ReviewSelectors, ScrollSettings,
};
pub use context::PageContext;
pub use error::{ParsingError, ParsingResult};
pub use extractor::{Extraction, RecordExtractor};
pub use item_parser::ItemParser;
pub use rating::{RatingEncoding, RatingFallback, RatingRule};
pub use review_parser::ReviewParser;
pub use selectors::SelectorList;

use scraper::Html;

/// Parser over a parsed document with caller-supplied context
pub trait ContextualParser {
    type Output;
    type Context;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}
