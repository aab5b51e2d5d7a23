//! In-memory crawl position and state machine states

use super::ItemId;
use std::fmt;

/// Where the orchestrator currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Catalog(u32),
    Item(ItemId),
    ReviewPage(ItemId, u32),
    Done,
}

impl CrawlState {
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(page) => write!(f, "Catalog({page})"),
            Self::Item(id) => write!(f, "Item({id})"),
            Self::ReviewPage(id, page) => write!(f, "ReviewPage({id}, {page})"),
            Self::Done => f.write_str("Done"),
        }
    }
}

/// Progress counters for the current run.
///
/// Not persisted; resume works at item granularity through the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCursor {
    pub catalog_page: u32,
    pub item_index: u32,
    pub review_page: u32,
}

impl CrawlCursor {
    pub fn enter_catalog_page(&mut self, page: u32) {
        self.catalog_page = page;
        self.item_index = 0;
        self.review_page = 0;
    }

    pub fn enter_item(&mut self) {
        self.item_index += 1;
        self.review_page = 0;
    }

    pub fn enter_review_page(&mut self) -> u32 {
        self.review_page += 1;
        self.review_page
    }
}

impl fmt::Display for CrawlCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "catalog page {}, item {}, review page {}",
            self.catalog_page, self.item_index, self.review_page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_resets_lower_levels() {
        let mut cursor = CrawlCursor::default();
        cursor.enter_catalog_page(1);
        cursor.enter_item();
        assert_eq!(cursor.enter_review_page(), 1);
        assert_eq!(cursor.enter_review_page(), 2);

        cursor.enter_item();
        assert_eq!(cursor.item_index, 2);
        assert_eq!(cursor.review_page, 0);

        cursor.enter_catalog_page(2);
        assert_eq!(cursor.item_index, 0);
    }
}
