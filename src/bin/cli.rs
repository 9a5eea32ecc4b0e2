//! vodcrawl CLI
//!
//! Loads adapter definitions and runs single stages or whole-site crawls,
//! printing JSON to stdout or to `--output`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use vodcrawl::{
    config::{self, Engine},
    error::{AppError, Result},
    models::{Config, VodRecord},
    pipeline::{self, CrawlOptions},
    services::{StageOutput, StageReport, StageRequest},
    utils,
};

/// vodcrawl - adapter-driven video catalog extractor
#[derive(Parser, Debug)]
#[command(
    name = "vodcrawl",
    version,
    about = "Adapter-driven catalog extraction for video aggregator sites"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Adapter directory (overrides [adapters].dir)
    #[arg(short, long)]
    adapters: Option<PathBuf>,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate every adapter definition
    Validate,

    /// List registered sites
    Sites,

    /// Categories and featured items from the home page
    Home { site: String },

    /// One page of a category listing
    Category {
        site: String,
        cate_id: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Filter value as key=value (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Declared filter dimensions of a category
    Filters { site: String, cate_id: String },

    /// Detail page of one title
    Detail { site: String, vid: String },

    /// Play page of one episode
    Play { site: String, play_id: String },

    /// Search a site
    Search { site: String, query: String },

    /// Crawl home, category listings and optionally details
    Crawl {
        site: String,

        /// Number of detail pages to fetch
        #[arg(long, default_value_t = 0)]
        details: usize,
    },
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
    utils::log::init(level);
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("Output written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Stage output in canonical record form where one exists.
fn canonical(report: StageReport) -> serde_json::Result<serde_json::Value> {
    match report.output {
        StageOutput::Items(items) => {
            serde_json::to_value(items.into_iter().map(VodRecord::from).collect::<Vec<_>>())
        }
        StageOutput::Search(results) => {
            serde_json::to_value(results.into_iter().map(VodRecord::from).collect::<Vec<_>>())
        }
        StageOutput::Detail(detail) => serde_json::to_value(detail.map(VodRecord::from)),
        other => serde_json::to_value(other),
    }
}

fn validate(adapter_dir: &Path, output: Option<&Path>) -> Result<()> {
    let checks = pipeline::run_validate(adapter_dir)?;
    write_json(&checks, output)?;
    let invalid = checks.iter().filter(|c| !c.is_valid()).count();
    if invalid > 0 {
        return Err(AppError::config(
            "adapters",
            format!("{invalid} invalid adapter definition(s)"),
        ));
    }
    Ok(())
}

fn engine(config: Config, adapter_dir: &Path) -> Result<Engine> {
    let registry = config::load_registry(adapter_dir)?;
    Engine::new(config, registry)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);

    let adapter_dir = config::adapter_dir(&config, cli.adapters.as_deref());
    let output = cli.output.as_deref();

    let (site, request) = match cli.command {
        Command::Validate => return validate(&adapter_dir, output),
        Command::Sites => {
            let engine = engine(config, &adapter_dir)?;
            return write_json(&engine.registry.sites(), output);
        }
        Command::Crawl { site, details } => {
            let options = CrawlOptions {
                workers: config.crawler.max_concurrent,
                details,
            };
            let pipeline = engine(config, &adapter_dir)?.pipeline(&site)?;
            let outcome = pipeline::crawl_site(&pipeline, &options).await;
            return write_json(&outcome, output);
        }
        Command::Home { site } => (site, StageRequest::Home),
        Command::Category {
            site,
            cate_id,
            page,
            filters,
        } => (
            site,
            StageRequest::Category {
                cate_id,
                filters: filters.into_iter().collect::<BTreeMap<_, _>>(),
                page,
            },
        ),
        Command::Filters { site, cate_id } => (site, StageRequest::Filters { cate_id }),
        Command::Detail { site, vid } => (site, StageRequest::Detail { vid }),
        Command::Play { site, play_id } => (site, StageRequest::Play { play_id }),
        Command::Search { site, query } => (site, StageRequest::Search { query }),
    };

    let pipeline = engine(config, &adapter_dir)?.pipeline(&site)?;
    let report = pipeline.run(&request).await;
    if let Some(error) = &report.error {
        log::error!("{} {} stage failed: {}", site, report.stage, error);
        write_json(&report, output)?;
        std::process::exit(1);
    }

    write_json(&canonical(report)?, output)
}
