//! Test utilities for the crawl core
//!
//! A scripted [`FakeBrowser`] that serves canned markup per URL, so the
//! walker and orchestrator can be exercised without Chromium. Every call is
//! recorded in a shared action log the test can inspect afterwards.

use crate::infrastructure::browser::{Browser, BrowserError, BrowserLauncher, BrowserResult};
use crate::infrastructure::config::CrawlSettings;
use crate::infrastructure::parsing::{
    CatalogSelectors, ItemSelectors, NormalizerRules, RatingEncoding, RatingFallback, RatingRule,
    ReviewGate, ReviewPagination, ReviewSelectors,
};
use crate::infrastructure::site_profiles::SiteProfile;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

pub type ActionLog = Rc<RefCell<Vec<String>>>;

/// One rendering of a page: markup, the selectors that are present, and
/// which clicks lead to which other rendering.
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    pub markup: String,
    pub present: HashSet<String>,
    pub clicks: HashMap<String, usize>,
}

impl FakeState {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Self::default()
        }
    }

    pub fn with_present(mut self, selectors: &[&str]) -> Self {
        self.present.extend(selectors.iter().map(ToString::to_string));
        self
    }

    /// Clicking `selector` switches the tab to rendering `target`.
    pub fn with_click(mut self, selector: &str, target: usize) -> Self {
        self.clicks.insert(selector.to_string(), target);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub states: Vec<FakeState>,
    /// Successive `scroll_height` values; the last one repeats
    pub heights: Vec<u64>,
}

impl FakePage {
    pub fn single(state: FakeState) -> Self {
        Self {
            states: vec![state],
            heights: Vec::new(),
        }
    }

    pub fn paged(states: Vec<FakeState>) -> Self {
        Self {
            states,
            heights: Vec::new(),
        }
    }

    pub fn with_heights(mut self, heights: &[u64]) -> Self {
        self.heights = heights.to_vec();
        self
    }
}

/// The scripted web: URL to page.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }
}

#[derive(Debug, Clone)]
struct Tab {
    url: String,
    state: usize,
    scrolls: usize,
}

impl Tab {
    fn blank() -> Self {
        Self {
            url: "about:blank".to_string(),
            state: 0,
            scrolls: 0,
        }
    }
}

pub struct FakeBrowser {
    site: Rc<FakeSite>,
    tabs: Vec<Tab>,
    log: ActionLog,
}

impl FakeBrowser {
    pub fn new(site: FakeSite) -> Self {
        Self::with_log(Rc::new(site), ActionLog::default())
    }

    fn with_log(site: Rc<FakeSite>, log: ActionLog) -> Self {
        Self {
            site,
            tabs: vec![Tab::blank()],
            log,
        }
    }

    pub fn log(&self) -> ActionLog {
        Rc::clone(&self.log)
    }

    fn record(&self, action: String) {
        self.log.borrow_mut().push(action);
    }

    fn tab(&self) -> BrowserResult<&Tab> {
        self.tabs.last().ok_or(BrowserError::NoOpenTab)
    }

    fn page(&self) -> BrowserResult<Option<&FakePage>> {
        let tab = self.tab()?;
        Ok(self.site.pages.get(&tab.url))
    }

    fn state(&self) -> BrowserResult<Option<&FakeState>> {
        let state = self.tab()?.state;
        Ok(self.page()?.and_then(|page| page.states.get(state)))
    }

    fn load(&self, url: &str) -> BrowserResult<Tab> {
        if !self.site.pages.contains_key(url) {
            return Err(BrowserError::navigation_failed(url, "no such page"));
        }
        Ok(Tab {
            url: url.to_string(),
            state: 0,
            scrolls: 0,
        })
    }
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.record(format!("navigate {url}"));
        let tab = self.load(url)?;
        let active = self.tabs.last_mut().ok_or(BrowserError::NoOpenTab)?;
        *active = tab;
        Ok(())
    }

    fn current_url(&mut self) -> BrowserResult<String> {
        Ok(self.tab()?.url.clone())
    }

    fn current_markup(&mut self) -> BrowserResult<String> {
        Ok(self
            .state()?
            .map(|state| state.markup.clone())
            .unwrap_or_default())
    }

    fn scroll_to_bottom(&mut self) -> BrowserResult<()> {
        self.record("scroll".to_string());
        let tab = self.tabs.last_mut().ok_or(BrowserError::NoOpenTab)?;
        tab.scrolls += 1;
        Ok(())
    }

    fn scroll_height(&mut self) -> BrowserResult<u64> {
        let scrolls = self.tab()?.scrolls;
        Ok(self
            .page()?
            .and_then(|page| page.heights.get(scrolls).or_else(|| page.heights.last()))
            .copied()
            .unwrap_or(0))
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> BrowserResult<bool> {
        Ok(self
            .state()?
            .is_some_and(|state| state.present.contains(selector)))
    }

    fn click(&mut self, selector: &str, _timeout: Duration) -> BrowserResult<bool> {
        let target = self
            .state()?
            .and_then(|state| state.clicks.get(selector).copied());
        let Some(target) = target else {
            return Ok(false);
        };
        self.record(format!("click {selector}"));
        let tab = self.tabs.last_mut().ok_or(BrowserError::NoOpenTab)?;
        tab.state = target;
        Ok(true)
    }

    fn open_in_background_tab(&mut self, url: &str) -> BrowserResult<()> {
        self.record(format!("open {url}"));
        let tab = self.load(url)?;
        self.tabs.push(tab);
        Ok(())
    }

    fn close_tab(&mut self) -> BrowserResult<()> {
        if self.tabs.len() <= 1 {
            return Err(BrowserError::NoOpenTab);
        }
        self.record("close".to_string());
        self.tabs.pop();
        Ok(())
    }

    fn settle(&mut self, _pause: Duration) {}
}

/// Hands out fake sessions over one shared site and action log.
pub struct FakeLauncher {
    site: Rc<FakeSite>,
    log: ActionLog,
    failures_left: Cell<u32>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Rc::new(site),
            log: ActionLog::default(),
            failures_left: Cell::new(0),
        }
    }

    /// The next `count` launches fail.
    pub fn failing(self, count: u32) -> Self {
        self.failures_left.set(count);
        self
    }

    pub fn log(&self) -> ActionLog {
        Rc::clone(&self.log)
    }
}

impl BrowserLauncher for FakeLauncher {
    type Session = FakeBrowser;

    fn launch(&self) -> BrowserResult<FakeBrowser> {
        self.log.borrow_mut().push("launch".to_string());
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(BrowserError::launch_failed("scripted launch failure"));
        }
        Ok(FakeBrowser::with_log(Rc::clone(&self.site), Rc::clone(&self.log)))
    }
}

/// A small profile matching the markup built by [`item_page`].
pub fn test_profile() -> SiteProfile {
    SiteProfile {
        name: "test".to_string(),
        catalog: CatalogSelectors {
            landmark: ".catalog".to_string(),
            item_links: vec!["a.item".to_string()],
            link_path_prefix: None,
            next_page: Some("a.next".to_string()),
            scroll: None,
        },
        item: ItemSelectors {
            landmark: Some(".item".to_string()),
            name: vec!["h1".to_string()],
            description: vec![".desc".to_string()],
            description_reveal: None,
        },
        gate: ReviewGate {
            review_count: Vec::new(),
            reveal: None,
            reviews_link: Vec::new(),
            landmark: ".reviews".to_string(),
        },
        reviews: ReviewSelectors {
            container: vec![".review".to_string()],
            text: vec![".text".to_string()],
            rating: vec![".stars".to_string()],
            title: Vec::new(),
        },
        pagination: ReviewPagination::Click {
            next: "a.reviews-next".to_string(),
            timeout_secs: 1,
            scroll: None,
        },
        rating: RatingRule {
            encoding: RatingEncoding::ClassSuffix {
                class_prefix: "star".to_string(),
            },
            scale_max: 5,
            on_malformed: RatingFallback::Zero,
        },
        normalizer: NormalizerRules {
            labels: vec!["Pros".to_string()],
            trailing_markers: vec!["More".to_string()],
        },
    }
}

pub fn test_settings() -> CrawlSettings {
    CrawlSettings {
        landmark_timeout_secs: 1,
        reveal_timeout_secs: 1,
        settle_ms: 0,
        max_run_duration_secs: None,
        max_item_duration_secs: None,
        max_catalog_pages: None,
    }
}

pub fn item_page(name: &str, description: &str, reviews: &[(&str, u8)]) -> String {
    let reviews: String = reviews
        .iter()
        .map(|(text, stars)| {
            format!(
                r#"<div class="review"><p class="text">{text}</p><span class="stars star{stars}"></span></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="item"><h1>{name}</h1><div class="desc">{description}</div></div><div class="reviews">{reviews}</div></body></html>"#
    )
}

pub fn catalog_page(links: &[&str]) -> String {
    let links: String = links
        .iter()
        .map(|href| format!(r#"<a class="item" href="{href}">item</a>"#))
        .collect();
    format!(r#"<html><body><div class="catalog">{links}</div></body></html>"#)
}
