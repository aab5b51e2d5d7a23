//! Compiled fallback selector lists
//!
//! Every extraction target is configured as a list of CSS selectors tried in
//! order; the first one that yields a non-empty value wins.

use super::{ParsingError, ParsingResult};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SelectorList {
    sources: Vec<String>,
    compiled: Vec<Selector>,
}

impl SelectorList {
    /// Compile every selector, failing on the first invalid one.
    ///
    /// An empty list is allowed and simply never matches.
    pub fn compile(sources: &[String]) -> ParsingResult<Self> {
        let compiled = sources
            .iter()
            .map(|s| Selector::parse(s).map_err(|e| ParsingError::invalid_selector(s, e)))
            .collect::<ParsingResult<Vec<_>>>()?;

        debug!("Compiled {} selectors: {:?}", compiled.len(), sources);
        Ok(Self {
            sources: sources.to_vec(),
            compiled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Elements matched by the first selector that matches anything.
    pub fn select_document<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        self.compiled
            .iter()
            .map(|selector| html.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// First descendant of `element` matched by any selector, in list order.
    pub fn first_in<'a>(&self, element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.compiled
            .iter()
            .find_map(|selector| element.select(selector).next())
    }

    /// Text of the first matching element in the document, trimmed and non-empty.
    pub fn text_in_document(&self, html: &Html) -> Option<String> {
        self.compiled.iter().find_map(|selector| {
            html.select(selector)
                .map(|e| element_text(&e))
                .find(|text| !text.is_empty())
        })
    }

    /// Text of the first matching descendant, trimmed and non-empty.
    pub fn text_in(&self, element: &ElementRef) -> Option<String> {
        self.compiled.iter().find_map(|selector| {
            element
                .select(selector)
                .map(|e| element_text(&e))
                .find(|text| !text.is_empty())
        })
    }

    /// `attr` of the first matching element in the document that carries it.
    pub fn attr_in_document(&self, html: &Html, attr: &str) -> Option<String> {
        self.compiled.iter().find_map(|selector| {
            html.select(selector)
                .find_map(|e| e.value().attr(attr).map(str::to_string))
        })
    }
}

/// Text nodes joined by single spaces, so adjacent blocks never glue together.
pub fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
