//! Selector configuration for catalog, item and review pages
//!
//! Every extraction target is a list of fallback CSS selectors. Selectors
//! used only for browser interaction (landmarks, click targets) may also be
//! XPath expressions starting with `//` or `(`.

use serde::{Deserialize, Serialize};

/// Infinite-scroll settling behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSettings {
    /// Wall-clock budget for one settling pass
    pub budget_secs: u64,

    /// Hard cap on scroll-to-bottom actions
    pub max_scrolls: Option<u32>,

    /// Consecutive unchanged heights that count as "settled"
    pub stable_rounds: u32,

    /// Pause after each scroll so lazy content can load
    pub pause_ms: u64,

    /// Stop as soon as this element disappears (a loading spinner)
    pub stop_when_absent: Option<String>,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            budget_secs: 60,
            max_scrolls: None,
            stable_rounds: 2,
            pause_ms: 2000,
            stop_when_absent: None,
        }
    }
}

/// Catalog (listing) page selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSelectors {
    /// Element that signals the listing has rendered
    pub landmark: String,

    /// Item links - multiple fallbacks
    pub item_links: Vec<String>,

    /// Keep only links whose path starts with this prefix
    pub link_path_prefix: Option<String>,

    /// "Next page" control; `None` means single-page catalogs
    pub next_page: Option<String>,

    /// Scroll settling before reading the listing
    pub scroll: Option<ScrollSettings>,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            landmark: "body".to_string(),
            item_links: vec![
                "a.product-card__link".to_string(),
                "a[data-item-link]".to_string(),
                ".product-card a[href]".to_string(),
            ],
            link_path_prefix: None,
            next_page: None,
            scroll: None,
        }
    }
}

/// Item page selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSelectors {
    pub landmark: Option<String>,
    pub name: Vec<String>,
    pub description: Vec<String>,

    /// Control that must be clicked before the description is rendered
    pub description_reveal: Option<String>,
}

impl Default for ItemSelectors {
    fn default() -> Self {
        Self {
            landmark: None,
            name: vec!["h1".to_string(), "[itemprop=\"name\"]".to_string()],
            description: vec![
                "[itemprop=\"description\"]".to_string(),
                ".product-description".to_string(),
            ],
            description_reveal: None,
        }
    }
}

/// How the orchestrator decides that an item has reviews and reaches them.
///
/// Checked in order: review count, reveal click, separate reviews page,
/// landmark wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewGate {
    /// Counter element; a count of 0 closes the gate
    pub review_count: Vec<String>,

    /// Tab or button that reveals the reviews section
    pub reveal: Option<String>,

    /// Link to a dedicated reviews page
    pub reviews_link: Vec<String>,

    /// Element present once reviews are on screen
    pub landmark: String,
}

impl Default for ReviewGate {
    fn default() -> Self {
        Self {
            review_count: Vec::new(),
            reveal: None,
            reviews_link: Vec::new(),
            landmark: ".review".to_string(),
        }
    }
}

/// Review block selectors, relative to each container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSelectors {
    pub container: Vec<String>,
    pub text: Vec<String>,

    /// Empty means the rating is encoded on the container itself
    pub rating: Vec<String>,

    /// Header whose text is cut from the front of the review text
    pub title: Vec<String>,
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            container: vec![".review".to_string()],
            text: vec![".review__text".to_string(), "p".to_string()],
            rating: vec![".review__rating".to_string()],
            title: Vec::new(),
        }
    }
}

/// Review pagination mode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReviewPagination {
    /// Everything is on one page
    #[default]
    Single,
    /// Click a "next" control until it is gone
    Click {
        next: String,
        #[serde(default = "default_next_timeout_secs")]
        timeout_secs: u64,
        /// Scroll pass run on every page before it is read
        #[serde(default)]
        scroll: Option<ScrollSettings>,
    },
    /// Scroll until the page height settles
    InfiniteScroll(ScrollSettings),
}

const fn default_next_timeout_secs() -> u64 {
    5
}

/// Text cleanup rules for review bodies
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerRules {
    /// Structural labels stripped from the head of the text
    pub labels: Vec<String>,

    /// Text from the first marker onwards is discarded
    pub trailing_markers: Vec<String>,
}
