//! Logging system configuration and initialization
//!
//! - Console output on stderr, so stdout stays clean for command output
//! - Optional file output through a non-blocking writer
//! - Optional JSON format for the file layer
//! - Local-time timestamps
//! - `RUST_LOG` overrides the configured level and module filters

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use chrono::Local;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the file writer alive for the whole process
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Filter from `RUST_LOG` when set, otherwise from the configuration.
///
/// Dependency noise (CDP traffic, HTML tokenizer) is capped unless the
/// configured level is trace.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    directives_filter(config)
}

fn directives_filter(config: &LoggingConfig) -> EnvFilter {
    let level = config.level.to_lowercase();
    let mut filter = EnvFilter::new(&level);

    if level != "trace" {
        let mut modules: Vec<(&String, &String)> = config.module_filters.iter().collect();
        modules.sort();
        for (module, module_level) in modules {
            match format!("{}={}", module, module_level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring invalid log filter {}={}: {}", module, module_level, e),
            }
        }
    }

    if let Ok(directive) = format!("review_harvester={}", level).parse() {
        filter = filter.add_directive(directive);
    }
    filter
}

/// Rename an existing log file so each run starts a fresh one.
fn rotate_existing_log_file(log_dir: &Path, file_name: &str) -> Result<()> {
    let path = log_dir.join(file_name);
    if !path.exists() {
        return Ok(());
    }
    let modified = std::fs::metadata(&path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
    let stamp = chrono::DateTime::<Local>::from(modified).format("%Y%m%dT%H%M%S");
    let stem = file_name.trim_end_matches(".log");
    let rotated = log_dir.join(format!("{}.{}.log", stem, stamp));

    std::fs::rename(&path, &rotated).with_context(|| {
        format!("Failed to rotate {} to {}", path.display(), rotated.display())
    })?;
    Ok(())
}

/// Install the global subscriber. Fails if no output is enabled or a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        anyhow::bail!("No logging output configured");
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory {}", config.log_dir.display())
        })?;
        rotate_existing_log_file(&config.log_dir, &config.file_name)?;

        let (file_writer, guard) = non_blocking(rolling::never(&config.log_dir, &config.file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow::anyhow!("Log guard registry is poisoned"))?
            .push(guard);

        let file_layer = if config.json_format {
            fmt::Layer::new()
                .json()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(true)
                .with_ansi(false)
                .boxed()
        } else {
            fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .with_ansi(false)
                .boxed()
        };
        layers.push(file_layer);
    }

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    Registry::default()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!(
            "Log file: {}",
            config.log_dir.join(&config.file_name).display()
        );
    }
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== review-harvester {} ===", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {}", current_dir.display());
    }
}
