//! Catalog page parser: item links in document order

use super::{ContextualParser, PageContext, ParsingResult, SelectorList};
use super::config::CatalogSelectors;
use crate::domain::ItemId;
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

pub struct CatalogParser {
    item_links: SelectorList,
    link_path_prefix: Option<String>,
}

impl CatalogParser {
    pub fn new(selectors: &CatalogSelectors) -> ParsingResult<Self> {
        Ok(Self {
            item_links: SelectorList::compile(&selectors.item_links)?,
            link_path_prefix: selectors.link_path_prefix.clone(),
        })
    }

    fn resolve_link(&self, href: &str, base: &Url) -> Option<ItemId> {
        let resolved = match base.join(href.trim()) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping unresolvable item link '{}': {}", href, e);
                return None;
            }
        };

        if !matches!(resolved.scheme(), "http" | "https") {
            debug!("Skipping non-http item link {}", resolved);
            return None;
        }

        if let Some(prefix) = &self.link_path_prefix {
            if !resolved.path().starts_with(prefix.as_str()) {
                debug!("Skipping link outside '{}': {}", prefix, resolved);
                return None;
            }
        }

        Some(ItemId::from_url(&resolved))
    }
}

impl ContextualParser for CatalogParser {
    type Output = Vec<ItemId>;
    type Context = PageContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let base = Url::parse(&context.page_url).map_err(|e| {
            super::ParsingError::UrlResolutionFailed {
                url: context.page_url.clone(),
                reason: e.to_string(),
                base_url: None,
            }
        })?;

        let mut seen = HashSet::new();
        let links: Vec<ItemId> = self
            .item_links
            .select_document(html)
            .iter()
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| self.resolve_link(href, &base))
            .filter(|id| seen.insert(id.clone()))
            .collect();

        debug!(
            "Found {} item links on catalog page {}",
            links.len(),
            context.page_number
        );
        Ok(links)
    }
}
