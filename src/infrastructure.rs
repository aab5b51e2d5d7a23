//! Infrastructure layer - browser, files, configuration and logging
//!
//! Concrete implementations behind the traits the application layer uses:
//! the Chromium adapter for [`browser::Browser`], the CSV sink for
//! [`batch_sink::RowSink`], and the file-backed dedup ledger.

pub mod batch_sink;
pub mod browser;
pub mod chromium_browser;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod parsing;
pub mod site_profiles;

pub use batch_sink::{CsvBatchSink, RowSink, SinkError, SinkStats};
pub use browser::{Browser, BrowserError, BrowserLauncher, BrowserResult};
pub use chromium_browser::{ChromiumBrowser, ChromiumLauncher};
pub use config::{AppConfig, BrowserSettings, ConfigError, CrawlSettings, LoggingConfig, OutputSettings};
pub use ledger::{FileLedger, LedgerError};
pub use parsing::{ParsingError, RecordExtractor};
pub use site_profiles::SiteProfile;
