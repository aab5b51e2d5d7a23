//! Browser capability
//!
//! The crawl core drives pages only through this trait, so the Chromium
//! adapter can be swapped for a scripted fake in tests. All calls are
//! blocking. Selectors starting with `//` or `(` are XPath; anything else
//! is CSS.
//!
//! Absence is not an error: `wait_for` and `click` report a missing element
//! as `Ok(false)` once their timeout elapses.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("Failed to launch browser: {reason}")]
    LaunchFailed { reason: String },

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Script evaluation failed: {reason}")]
    ScriptFailed { reason: String },

    #[error("Browser protocol error: {reason}")]
    Protocol { reason: String },

    #[error("No open tab")]
    NoOpenTab,

    #[error("Browser session is closed")]
    SessionClosed,
}

impl BrowserError {
    pub fn launch_failed(reason: impl ToString) -> Self {
        Self::LaunchFailed {
            reason: reason.to_string(),
        }
    }

    pub fn navigation_failed(url: &str, reason: impl ToString) -> Self {
        Self::NavigationFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(reason: impl ToString) -> Self {
        Self::Protocol {
            reason: reason.to_string(),
        }
    }

    /// Whether the session is still usable after this error.
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::NavigationFailed { .. } | Self::ScriptFailed { .. } | Self::Protocol { .. } => {
                true
            }
            Self::LaunchFailed { .. } | Self::NoOpenTab | Self::SessionClosed => false,
        }
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// True when `selector` should be resolved as XPath.
pub fn is_xpath(selector: &str) -> bool {
    let selector = selector.trim_start();
    selector.starts_with("//") || selector.starts_with('(')
}

/// One live browser session.
///
/// Tabs form a stack: `open_in_background_tab` pushes a tab that receives
/// every later call, `close_tab` pops it and returns to the previous one.
pub trait Browser {
    fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    fn current_url(&mut self) -> BrowserResult<String>;

    fn current_markup(&mut self) -> BrowserResult<String>;

    fn scroll_to_bottom(&mut self) -> BrowserResult<()>;

    fn scroll_height(&mut self) -> BrowserResult<u64>;

    /// Waits until `selector` is present. `Ok(false)` on timeout.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> BrowserResult<bool>;

    /// Waits for `selector` to become clickable and clicks it. `Ok(false)` on timeout.
    fn click(&mut self, selector: &str, timeout: Duration) -> BrowserResult<bool>;

    fn open_in_background_tab(&mut self, url: &str) -> BrowserResult<()>;

    fn close_tab(&mut self) -> BrowserResult<()>;

    /// Blocking pause that lets the page render after an action.
    fn settle(&mut self, pause: Duration);
}

/// Starts browser sessions; one session per seed.
pub trait BrowserLauncher {
    type Session: Browser;

    fn launch(&self) -> BrowserResult<Self::Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xpath_detection() {
        assert!(is_xpath("//span[contains(text(), 'Reviews')]"));
        assert!(is_xpath("(//a)[2]"));
        assert!(!is_xpath("div._root_1dixh_6"));
        assert!(!is_xpath(".icon_pagination-arrow-right-black"));
    }

    #[test]
    fn test_recoverability() {
        assert!(BrowserError::navigation_failed("https://a.example", "timeout").is_recoverable());
        assert!(!BrowserError::launch_failed("no chrome").is_recoverable());
        assert!(!BrowserError::SessionClosed.is_recoverable());
    }
}
