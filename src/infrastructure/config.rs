//! Configuration infrastructure
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults (`defaults` module, `#[serde(default)]` everywhere)
//! 2. Optional config file (TOML, JSON or YAML by extension)
//! 3. `REVIEW_HARVESTER_*` environment variables, `__` between nested keys,
//!    e.g. `REVIEW_HARVESTER_OUTPUT__BATCH_SIZE=50`
//! 4. Command-line flags, applied by the binary

#![allow(clippy::uninlined_format_args)]

use crate::domain::SeedSpec;
use crate::infrastructure::parsing::ParsingError;
use crate::infrastructure::site_profiles::{PRESET_NAMES, SiteProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ENV_PREFIX: &str = "REVIEW_HARVESTER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Unknown site '{name}', expected one of {known:?} or an inline site_profile")]
    UnknownSite { name: String, known: Vec<String> },

    #[error("Invalid site profile: {source}")]
    Profile {
        #[from]
        source: ParsingError,
    },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preset name used when `site_profile` is absent
    pub site: String,

    /// Inline profile for sites without a preset
    pub site_profile: Option<SiteProfile>,

    /// Seeds from the config file, explicit URLs or id templates
    pub seeds: Vec<SeedSpec>,

    pub crawl: CrawlSettings,
    pub output: OutputSettings,
    pub browser: BrowserSettings,
    pub logging: LoggingConfig,
}

/// Traversal timeouts and budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Bounded wait for landmarks (catalog, item, reviews)
    pub landmark_timeout_secs: u64,

    /// Bounded wait for reveal controls (description, reviews tab)
    pub reveal_timeout_secs: u64,

    /// Pause after navigation and clicks
    pub settle_ms: u64,

    /// Whole-run wall-clock budget
    pub max_run_duration_secs: Option<u64>,

    /// Per-item wall-clock budget for review pagination
    pub max_item_duration_secs: Option<u64>,

    /// Stop a catalog walk after this many pages
    pub max_catalog_pages: Option<u32>,
}

/// Output file locations and flush thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub csv_path: PathBuf,
    pub ledger_path: PathBuf,

    /// Flush once this many rows are buffered
    pub batch_size: usize,

    /// Flush once this long has passed since the last flush
    pub flush_interval_secs: u64,
}

/// Chromium launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,

    /// Chrome/Chromium binary; auto-detected when absent
    pub chrome_executable: Option<PathBuf>,

    pub window_width: u32,
    pub window_height: u32,

    /// CDP request timeout
    pub request_timeout_secs: u64,

    /// Upper bound for a single navigation
    pub page_load_timeout_secs: u64,

    /// Poll interval for element waits
    pub poll_interval_ms: u64,

    /// Extra command-line switches passed to Chrome
    pub extra_args: Vec<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for the log file, relative to the working directory
    pub log_dir: PathBuf,

    pub file_name: String,

    /// Module-specific log level filters (e.g., "chromiumoxide": "warn")
    pub module_filters: HashMap<String, String>,
}

pub mod defaults {
    /// Default site preset
    pub const SITE: &str = "wildberries";

    /// Rows buffered before a flush
    pub const BATCH_SIZE: usize = 100;

    /// Seconds between time-based flushes
    pub const FLUSH_INTERVAL_SECS: u64 = 600;

    pub const CSV_PATH: &str = "reviews.csv";
    pub const LEDGER_PATH: &str = "links.txt";

    /// Landmark wait before a section counts as absent
    pub const LANDMARK_TIMEOUT_SECS: u64 = 10;

    pub const REVEAL_TIMEOUT_SECS: u64 = 10;

    /// Pause after navigation and clicks
    pub const SETTLE_MS: u64 = 3000;

    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const PAGE_LOAD_TIMEOUT_SECS: u64 = 180;
    pub const POLL_INTERVAL_MS: u64 = 100;
    pub const WINDOW_WIDTH: u32 = 1920;
    pub const WINDOW_HEIGHT: u32 = 1080;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_NAME: &str = "review-harvester.log";
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            landmark_timeout_secs: defaults::LANDMARK_TIMEOUT_SECS,
            reveal_timeout_secs: defaults::REVEAL_TIMEOUT_SECS,
            settle_ms: defaults::SETTLE_MS,
            max_run_duration_secs: None,
            max_item_duration_secs: None,
            max_catalog_pages: None,
        }
    }
}

impl CrawlSettings {
    pub const fn landmark_timeout(&self) -> Duration {
        Duration::from_secs(self.landmark_timeout_secs)
    }

    pub const fn reveal_timeout(&self) -> Duration {
        Duration::from_secs(self.reveal_timeout_secs)
    }

    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn max_run_duration(&self) -> Option<Duration> {
        self.max_run_duration_secs.map(Duration::from_secs)
    }

    pub fn max_item_duration(&self) -> Option<Duration> {
        self.max_item_duration_secs.map(Duration::from_secs)
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(defaults::CSV_PATH),
            ledger_path: PathBuf::from(defaults::LEDGER_PATH),
            batch_size: defaults::BATCH_SIZE,
            flush_interval_secs: defaults::FLUSH_INTERVAL_SECS,
        }
    }
}

impl OutputSettings {
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            window_width: defaults::WINDOW_WIDTH,
            window_height: defaults::WINDOW_HEIGHT,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            page_load_timeout_secs: defaults::PAGE_LOAD_TIMEOUT_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            extra_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--no-first-run".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("chromiumoxide".to_string(), "warn".to_string());
                filters.insert("tungstenite".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` if given, then environment overrides.
    ///
    /// Not validated here; callers apply their own overrides first and then
    /// call [`AppConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        if config.site.trim().is_empty() {
            config.site = defaults::SITE.to_string();
        }
        Ok(config)
    }

    /// The inline profile if present, otherwise the named preset.
    pub fn resolve_profile(&self) -> Result<SiteProfile, ConfigError> {
        if let Some(profile) = &self.site_profile {
            return Ok(profile.clone());
        }
        let name = if self.site.trim().is_empty() {
            defaults::SITE
        } else {
            self.site.as_str()
        };
        SiteProfile::preset(name).ok_or_else(|| ConfigError::UnknownSite {
            name: name.to_string(),
            known: PRESET_NAMES.iter().map(ToString::to_string).collect(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.batch_size == 0 {
            return Err(ConfigError::validation("output.batch_size must be greater than 0"));
        }
        if self.output.flush_interval_secs == 0 {
            return Err(ConfigError::validation(
                "output.flush_interval_secs must be greater than 0",
            ));
        }
        if self.output.csv_path == self.output.ledger_path {
            return Err(ConfigError::validation(
                "output.csv_path and output.ledger_path must differ",
            ));
        }
        for (name, value) in [
            ("crawl.landmark_timeout_secs", self.crawl.landmark_timeout_secs),
            ("crawl.reveal_timeout_secs", self.crawl.reveal_timeout_secs),
            ("browser.request_timeout_secs", self.browser.request_timeout_secs),
            ("browser.page_load_timeout_secs", self.browser.page_load_timeout_secs),
            ("browser.poll_interval_ms", self.browser.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(format!("{} must be greater than 0", name)));
            }
        }
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::validation(format!(
                "logging.level '{}' is not a known level",
                self.logging.level
            )));
        }

        self.resolve_profile()?.validate()?;
        Ok(())
    }
}
