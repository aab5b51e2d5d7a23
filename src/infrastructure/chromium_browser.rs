//! Chromium adapter for the [`Browser`] capability
//!
//! chromiumoxide is async; the crawl core is not. Each session owns a small
//! tokio runtime that drives the CDP connection, and every trait call blocks
//! on it. The handler task is aborted and the browser closed on drop.

#![allow(clippy::uninlined_format_args)]

use super::browser::{Browser, BrowserError, BrowserLauncher, BrowserResult, is_xpath};
use super::config::BrowserSettings;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight); true";
const SCROLL_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";

/// Launches one headless (or headed) Chromium per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub const fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> BrowserResult<BrowserConfig> {
        let settings = &self.settings;
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .window_size(settings.window_width, settings.window_height)
            .no_sandbox();

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &settings.extra_args {
            builder = builder.arg(arg.as_str());
        }

        builder.build().map_err(BrowserError::launch_failed)
    }
}

impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumBrowser;

    fn launch(&self) -> BrowserResult<Self::Session> {
        let config = self.browser_config()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(BrowserError::launch_failed)?;

        info!("Launching Chromium (headless: {})", self.settings.headless);
        let (browser, mut handler) = runtime
            .block_on(CdpBrowser::launch(config))
            .map_err(BrowserError::launch_failed)?;

        let handler_task = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler task completed");
        });

        let first_tab = runtime
            .block_on(browser.new_page("about:blank"))
            .map_err(BrowserError::launch_failed)?;

        Ok(ChromiumBrowser {
            runtime,
            browser: Some(browser),
            handler: handler_task,
            tabs: vec![first_tab],
            page_load_timeout: Duration::from_secs(self.settings.page_load_timeout_secs),
            poll_interval: Duration::from_millis(self.settings.poll_interval_ms),
        })
    }
}

/// A live Chromium session. Tabs are a stack; the last one is active.
pub struct ChromiumBrowser {
    runtime: Runtime,
    browser: Option<CdpBrowser>,
    handler: JoinHandle<()>,
    tabs: Vec<Page>,
    page_load_timeout: Duration,
    poll_interval: Duration,
}

impl ChromiumBrowser {
    fn active_tab(&self) -> BrowserResult<&Page> {
        self.tabs.last().ok_or(BrowserError::NoOpenTab)
    }

    fn find(&self, selector: &str) -> Option<Element> {
        let page = self.active_tab().ok()?;
        self.runtime
            .block_on(async {
                if is_xpath(selector) {
                    page.find_xpath(selector).await
                } else {
                    page.find_element(selector).await
                }
            })
            .ok()
    }

    fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> BrowserResult<T> {
        let page = self.active_tab()?;
        self.runtime.block_on(async {
            page.evaluate(script)
                .await
                .map_err(|e| BrowserError::ScriptFailed {
                    reason: e.to_string(),
                })?
                .into_value::<T>()
                .map_err(|e| BrowserError::ScriptFailed {
                    reason: e.to_string(),
                })
        })
    }

    /// Poll until `attempt` succeeds or `timeout` elapses. One attempt is
    /// always made, even with a zero timeout.
    fn poll<T>(&self, timeout: Duration, mut attempt: impl FnMut(&Self) -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = attempt(self) {
                return Some(found);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Browser for ChromiumBrowser {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        let page = self.active_tab()?;
        let timeout = self.page_load_timeout;
        debug!("Navigating to {}", url);
        self.runtime.block_on(async {
            match tokio::time::timeout(timeout, page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(BrowserError::navigation_failed(url, e)),
                Err(_) => Err(BrowserError::navigation_failed(
                    url,
                    format!("page load exceeded {:?}", timeout),
                )),
            }
        })
    }

    fn current_url(&mut self) -> BrowserResult<String> {
        let page = self.active_tab()?;
        self.runtime
            .block_on(page.url())
            .map_err(BrowserError::protocol)?
            .ok_or_else(|| BrowserError::protocol("active tab has no URL"))
    }

    fn current_markup(&mut self) -> BrowserResult<String> {
        let page = self.active_tab()?;
        self.runtime
            .block_on(page.content())
            .map_err(BrowserError::protocol)
    }

    fn scroll_to_bottom(&mut self) -> BrowserResult<()> {
        self.evaluate::<bool>(SCROLL_TO_BOTTOM_JS).map(|_| ())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn scroll_height(&mut self) -> BrowserResult<u64> {
        let height = self.evaluate::<f64>(SCROLL_HEIGHT_JS)?;
        Ok(height.max(0.0) as u64)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> BrowserResult<bool> {
        self.active_tab()?;
        let found = self.poll(timeout, |this| this.find(selector)).is_some();
        if !found {
            debug!("'{}' not present after {:?}", selector, timeout);
        }
        Ok(found)
    }

    fn click(&mut self, selector: &str, timeout: Duration) -> BrowserResult<bool> {
        self.active_tab()?;
        let clicked = self
            .poll(timeout, |this| {
                let element = this.find(selector)?;
                this.runtime.block_on(async {
                    let _ = element.scroll_into_view().await;
                    element.click().await.ok().map(|_| ())
                })
            })
            .is_some();
        if !clicked {
            debug!("'{}' not clickable after {:?}", selector, timeout);
        }
        Ok(clicked)
    }

    fn open_in_background_tab(&mut self, url: &str) -> BrowserResult<()> {
        let browser = self.browser.as_ref().ok_or(BrowserError::SessionClosed)?;
        let timeout = self.page_load_timeout;
        let page = self.runtime.block_on(async {
            match tokio::time::timeout(timeout, browser.new_page(url)).await {
                Ok(Ok(page)) => Ok(page),
                Ok(Err(e)) => Err(BrowserError::navigation_failed(url, e)),
                Err(_) => Err(BrowserError::navigation_failed(
                    url,
                    format!("page load exceeded {:?}", timeout),
                )),
            }
        })?;
        self.tabs.push(page);
        debug!("Opened tab {} for {}", self.tabs.len(), url);
        Ok(())
    }

    fn close_tab(&mut self) -> BrowserResult<()> {
        if self.tabs.len() <= 1 {
            return Err(BrowserError::NoOpenTab);
        }
        let page = self.tabs.pop().ok_or(BrowserError::NoOpenTab)?;
        self.runtime
            .block_on(page.close())
            .map_err(BrowserError::protocol)
    }

    fn settle(&mut self, pause: Duration) {
        std::thread::sleep(pause);
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.tabs.clear();
        if let Some(mut browser) = self.browser.take() {
            info!("Closing browser session");
            let closed = self.runtime.block_on(async {
                browser.close().await?;
                browser.wait().await?;
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
            });
            if let Err(e) = closed {
                warn!("Browser did not shut down cleanly: {}", e);
            }
        }
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builds_from_settings() {
        let launcher = ChromiumLauncher::new(BrowserSettings {
            chrome_executable: Some("/usr/bin/chromium".into()),
            ..BrowserSettings::default()
        });
        assert!(launcher.browser_config().is_ok());
    }
}
