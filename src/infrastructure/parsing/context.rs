//! Parsing context for link resolution and log messages

/// Where a piece of markup came from.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// URL the markup was rendered from, used to resolve relative links
    pub page_url: String,

    /// 1-based page number within the current walk
    pub page_number: u32,
}

impl PageContext {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            page_number: 1,
        }
    }

    #[must_use]
    pub const fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }
}
