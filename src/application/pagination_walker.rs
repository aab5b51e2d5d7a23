//! Pagination walker
//!
//! Drives a [`Browser`] through the pages of one section (a catalog listing
//! or an item's reviews) and yields a signal each time a page is ready to
//! be read. The sequence ends when the landmark is missing, the "next"
//! control is gone, or the deadline has passed. It is not restartable; walk
//! again by re-navigating to the first page.

use crate::infrastructure::browser::{Browser, BrowserResult};
use crate::infrastructure::config::CrawlSettings;
use crate::infrastructure::parsing::{CatalogSelectors, ReviewPagination, ScrollSettings};
use crate::infrastructure::site_profiles::SiteProfile;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A page whose content is rendered and settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageReady {
    /// 1-based page number within this walk
    pub number: u32,
    /// Scroll actions spent settling the page
    pub scrolls: u32,
}

/// How the walker moves from one page to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAdvance {
    /// One page only
    Single,
    /// Click `next`; every page may need a scroll pass first
    Click {
        next: String,
        timeout: Duration,
        scroll: Option<ScrollSettings>,
    },
    /// One page that grows while scrolled
    InfiniteScroll(ScrollSettings),
}

impl PageAdvance {
    fn scroll(&self) -> Option<&ScrollSettings> {
        match self {
            Self::Single => None,
            Self::Click { scroll, .. } => scroll.as_ref(),
            Self::InfiniteScroll(settings) => Some(settings),
        }
    }
}

impl From<&ReviewPagination> for PageAdvance {
    fn from(pagination: &ReviewPagination) -> Self {
        match pagination {
            ReviewPagination::Single => Self::Single,
            ReviewPagination::Click {
                next,
                timeout_secs,
                scroll,
            } => Self::Click {
                next: next.clone(),
                timeout: Duration::from_secs(*timeout_secs),
                scroll: scroll.clone(),
            },
            ReviewPagination::InfiniteScroll(settings) => Self::InfiniteScroll(settings.clone()),
        }
    }
}

pub struct PaginationWalker {
    landmark: String,
    advance: PageAdvance,
    landmark_timeout: Duration,
    settle: Duration,
    deadline: Option<Instant>,
    max_pages: Option<u32>,
    pages: u32,
    exhausted: bool,
}

impl PaginationWalker {
    pub fn new(
        landmark: impl Into<String>,
        advance: PageAdvance,
        landmark_timeout: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            landmark: landmark.into(),
            advance,
            landmark_timeout,
            settle,
            deadline: None,
            max_pages: None,
            pages: 0,
            exhausted: false,
        }
    }

    /// Walker over catalog listing pages.
    pub fn for_catalog(catalog: &CatalogSelectors, settings: &CrawlSettings) -> Self {
        let advance = match (&catalog.next_page, &catalog.scroll) {
            (Some(next), scroll) => PageAdvance::Click {
                next: next.clone(),
                timeout: settings.reveal_timeout(),
                scroll: scroll.clone(),
            },
            (None, Some(scroll)) => PageAdvance::InfiniteScroll(scroll.clone()),
            (None, None) => PageAdvance::Single,
        };
        Self::new(
            catalog.landmark.clone(),
            advance,
            settings.landmark_timeout(),
            settings.settle(),
        )
        .with_max_pages(settings.max_catalog_pages)
    }

    /// Walker over an item's review pages.
    pub fn for_reviews(profile: &SiteProfile, settings: &CrawlSettings) -> Self {
        Self::new(
            profile.gate.landmark.clone(),
            PageAdvance::from(&profile.pagination),
            settings.landmark_timeout(),
            settings.settle(),
        )
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub const fn pages(&self) -> u32 {
        self.pages
    }

    /// Advance to the next ready page, or `None` when the section is done.
    ///
    /// The first call only waits for the current page; later calls click
    /// through first. Absent elements end the walk and are not errors.
    pub fn next_page<B: Browser>(&mut self, browser: &mut B) -> BrowserResult<Option<PageReady>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("⏱️ Deadline reached after {} pages of '{}'", self.pages, self.landmark);
            return Ok(self.finish());
        }
        if self.max_pages.is_some_and(|max| self.pages >= max) {
            info!("Page limit {} reached", self.pages);
            return Ok(self.finish());
        }

        let mut previous = None;
        if self.pages > 0 {
            let PageAdvance::Click { next, timeout, .. } = &self.advance else {
                return Ok(self.finish());
            };
            let before = browser.current_markup()?;
            if !browser.click(next, *timeout)? {
                debug!("No next control '{}' after page {}", next, self.pages);
                return Ok(self.finish());
            }
            browser.settle(self.settle);
            previous = Some(before);
        }

        if !browser.wait_for(&self.landmark, self.landmark_timeout)? {
            debug!("Landmark '{}' absent on page {}", self.landmark, self.pages + 1);
            return Ok(self.finish());
        }

        // A "next" control that stays clickable on the last page leaves the
        // content unchanged.
        if let Some(before) = previous {
            if browser.current_markup()? == before {
                debug!("Page unchanged after next click, stopping at page {}", self.pages);
                return Ok(self.finish());
            }
        }

        let scrolls = match self.advance.scroll() {
            Some(scroll) => scroll_until_stable(browser, scroll)?,
            None => 0,
        };

        self.pages += 1;
        Ok(Some(PageReady {
            number: self.pages,
            scrolls,
        }))
    }

    fn finish(&mut self) -> Option<PageReady> {
        self.exhausted = true;
        None
    }
}

/// Scroll to the bottom until the page height stops changing.
///
/// Stops after `stable_rounds` consecutive unchanged heights, after
/// `max_scrolls` scrolls, when `stop_when_absent` disappears, or when the
/// budget runs out. Returns the number of scrolls made.
pub fn scroll_until_stable<B: Browser>(browser: &mut B, settings: &ScrollSettings) -> BrowserResult<u32> {
    let budget_end = Instant::now() + Duration::from_secs(settings.budget_secs);
    let pause = Duration::from_millis(settings.pause_ms);
    let mut last_height = browser.scroll_height()?;
    let mut stable = 0;
    let mut scrolls = 0;

    loop {
        if settings.max_scrolls.is_some_and(|max| scrolls >= max) {
            debug!("Scroll cap {} reached", scrolls);
            break;
        }
        if Instant::now() >= budget_end {
            debug!("Scroll budget of {}s spent after {} scrolls", settings.budget_secs, scrolls);
            break;
        }

        browser.scroll_to_bottom()?;
        scrolls += 1;
        browser.settle(pause);

        if let Some(indicator) = &settings.stop_when_absent {
            if !browser.wait_for(indicator, Duration::ZERO)? {
                debug!("'{}' gone after {} scrolls", indicator, scrolls);
                break;
            }
        }

        let height = browser.scroll_height()?;
        if height == last_height {
            stable += 1;
            if stable >= settings.stable_rounds {
                break;
            }
        } else {
            stable = 0;
            last_height = height;
        }
    }

    debug!("Scrolling settled at height {} after {} scrolls", last_height, scrolls);
    Ok(scrolls)
}
