use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use review_harvester::application::CrawlOrchestrator;
use review_harvester::domain::{Seed, SeedError, SeedKind};
use review_harvester::infrastructure::logging::{init_logging, log_system_info};
use review_harvester::infrastructure::site_profiles::PRESET_NAMES;
use review_harvester::infrastructure::{
    AppConfig, ChromiumLauncher, CsvBatchSink, FileLedger, SiteProfile,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "review-harvester", version, about = "Incremental review crawler")]
struct Cli {
    /// Config file (TOML, JSON or YAML)
    #[arg(long, short, global = true, env = "REVIEW_HARVESTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the given seeds, appending new reviews to the output file
    Crawl(CrawlArgs),
    /// List the built-in site presets
    Sites,
    /// Print the effective configuration as JSON
    ShowConfig,
}

#[derive(clap::Args, Debug)]
struct CrawlArgs {
    /// Site preset (wildberries, lamoda, mustapp)
    #[arg(long)]
    site: Option<String>,

    /// Seed URL (can be repeated)
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// File with one seed URL per line
    #[arg(long)]
    seeds_file: Option<PathBuf>,

    /// Treat command-line seeds as catalog listings (default)
    #[arg(long, conflicts_with = "item")]
    catalog: bool,

    /// Treat command-line seeds as single item pages
    #[arg(long)]
    item: bool,

    /// Output CSV path
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Processed-items ledger path
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, default_value_t = false)]
    headed: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Crawl(args) => crawl(cli.config.as_deref(), args),
        Command::Sites => list_sites().map(|()| ExitCode::SUCCESS),
        Command::ShowConfig => show_config(cli.config.as_deref()).map(|()| ExitCode::SUCCESS),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        ExitCode::FAILURE
    })
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).context("Failed to load configuration")
}

fn crawl(config_path: Option<&Path>, args: CrawlArgs) -> Result<ExitCode> {
    let mut config = load_config(config_path)?;
    if let Some(site) = args.site {
        config.site = site;
        config.site_profile = None;
    }
    if let Some(output) = args.output {
        config.output.csv_path = output;
    }
    if let Some(ledger) = args.ledger {
        config.output.ledger_path = ledger;
    }
    if args.headed {
        config.browser.headless = false;
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    log_system_info();

    let kind = if args.item { SeedKind::Item } else { SeedKind::Catalog };
    let seeds = collect_seeds(&config, &args.seeds, args.seeds_file.as_deref(), kind)?;
    if seeds.is_empty() {
        bail!("No seeds given; pass --seed, --seeds-file or list seeds in the config file");
    }

    let profile = config.resolve_profile()?;
    info!(
        "Site '{}', output {}, ledger {}",
        profile.name,
        config.output.csv_path.display(),
        config.output.ledger_path.display()
    );

    let ledger = FileLedger::load(&config.output.ledger_path).context("Failed to load ledger")?;
    let sink = CsvBatchSink::new(
        &config.output.csv_path,
        config.output.batch_size,
        config.output.flush_interval(),
    );
    let launcher = ChromiumLauncher::new(config.browser.clone());
    let mut orchestrator = CrawlOrchestrator::new(launcher, sink, ledger, profile, config.crawl.clone())
        .context("Site profile rejected")?;

    let report = orchestrator.run(&seeds);
    println!("{report}");

    if report.all_seeds_failed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Config seeds first, then `--seed` flags, then the seeds file. Invalid
/// entries are reported and skipped.
fn collect_seeds(
    config: &AppConfig,
    cli_seeds: &[String],
    seeds_file: Option<&Path>,
    kind: SeedKind,
) -> Result<Vec<Seed>> {
    let mut candidates: Vec<_> = config.seeds.iter().flat_map(|spec| spec.expand()).collect();
    candidates.extend(cli_seeds.iter().map(|url| Seed::new(url, kind)));
    if let Some(path) = seeds_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seeds file {}", path.display()))?;
        candidates.extend(Seed::parse_lines(&text, kind));
    }

    Ok(dedup_seeds(candidates))
}

/// Drop invalid and repeated seeds, keeping first-seen order.
fn dedup_seeds(candidates: Vec<Result<Seed, SeedError>>) -> Vec<Seed> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut seeds = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match candidate {
            Ok(seed) => {
                if seen.insert(seed.url().to_string()) {
                    seeds.push(seed);
                }
            }
            Err(e) => warn!("Skipping seed: {}", e),
        }
    }
    seeds
}

fn list_sites() -> Result<()> {
    for name in PRESET_NAMES {
        let profile = SiteProfile::preset(name).context("preset table out of sync")?;
        let pagination = serde_json::to_value(&profile.pagination)?;
        println!(
            "{:<12} pagination: {}, rating scale 0..={}",
            profile.name,
            pagination
                .get("mode")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("single"),
            profile.rating.scale_max
        );
    }
    Ok(())
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().context("Invalid configuration")?;
    let profile = config.resolve_profile()?;
    let effective = serde_json::json!({
        "config": config,
        "profile": profile,
    });
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_seeds_keeps_first_occurrence() {
        let candidates = vec![
            Seed::new("https://shop.example/p/1", SeedKind::Item),
            Seed::new("https://shop.example/p/2", SeedKind::Item),
            Seed::new("not a url", SeedKind::Item),
            Seed::new("https://shop.example/p/1", SeedKind::Item),
        ];

        let seeds = dedup_seeds(candidates);

        let urls: Vec<_> = seeds.iter().map(Seed::url).collect();
        assert_eq!(urls, vec!["https://shop.example/p/1", "https://shop.example/p/2"]);
    }

    #[test]
    fn test_dedup_seeds_handles_large_template_ranges() {
        let candidates: Vec<_> = (0..20_000)
            .map(|id| Seed::new(&format!("https://mustapp.com/p/{}", id % 10_000), SeedKind::Item))
            .collect();

        assert_eq!(dedup_seeds(candidates).len(), 10_000);
    }
}
