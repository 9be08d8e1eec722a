//! wiki-mirror main entry point
//!
//! This is the command-line interface for the wiki-mirror offline mirroring tool.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wiki_mirror::cache::open_store;
use wiki_mirror::config::{fingerprint_config, load_config_with_hash, validate, Config};
use wiki_mirror::crawler::crawl;
use wiki_mirror::output::{
    generate_markdown_report, load_statistics, print_statistics, write_site, CrawlReport,
};
use wiki_mirror::TextRenderer;

/// wiki-mirror: an offline mirror for a wiki-like knowledge base
///
/// wiki-mirror fetches page payloads from the source site's JSON API,
/// follows the page references embedded in them, caches every payload on
/// disk and renders a cross-linked static HTML site.
#[derive(Parser, Debug)]
#[command(name = "wiki-mirror")]
#[command(version)]
#[command(about = "Offline mirror for a wiki-like knowledge base", long_about = None)]
struct Cli {
    /// Ids or aliases of the pages to start from
    #[arg(value_name = "PAGES")]
    pages: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Follow every page reference (and start from every cached page)
    #[arg(short, long)]
    recursive: bool,

    /// Also fetch every earlier edit of each page
    #[arg(long)]
    history: bool,

    /// Never touch the network; only cached payloads are used
    #[arg(long)]
    cache_only: bool,

    /// Leave pages that failed on an earlier run alone
    #[arg(long)]
    no_retry_failed: bool,

    /// Cache directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,

    /// Site output directory (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics about the cache and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Crawl only; don't write the site
    #[arg(long)]
    no_site: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &cli.pages);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &cli.pages, cli.no_site).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wiki_mirror=info,warn"),
            1 => EnvFilter::new("wiki_mirror=debug,info"),
            2 => EnvFilter::new("wiki_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or defaults) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.recursive {
        config.crawl.recursive = true;
    }
    if cli.history {
        config.crawl.history = true;
    }
    if cli.cache_only {
        config.crawl.cache_only = true;
    }
    if cli.no_retry_failed {
        config.crawl.retry_failed = false;
    }
    if let Some(cache) = &cli.cache {
        config.cache.directory = cache.display().to_string();
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.display().to_string();
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration and roots
fn handle_dry_run(config: &Config, roots: &[String]) {
    println!("=== wiki-mirror Dry Run ===\n");

    println!("Source:");
    println!("  Domain: {}", config.source.domain);
    println!("  API base URL: {}", config.source.base_url);
    println!("  Timeout: {}ms", config.source.timeout_ms);
    println!("  User agent: {}", config.source.user_agent);

    println!("\nCrawl:");
    println!("  Recursive: {}", config.crawl.recursive);
    println!("  History: {}", config.crawl.history);
    println!("  Cache only: {}", config.crawl.cache_only);
    println!("  Retry failed: {}", config.crawl.retry_failed);

    println!("\nDirectories:");
    println!("  Cache: {}", config.cache.directory);
    println!("  Site: {}", config.output.directory);

    println!("\nRoots ({}):", roots.len());
    for root in roots {
        println!("  - {}", root);
    }

    println!("\n✓ Configuration is valid (fingerprint {})", fingerprint_config(config));
    if roots.is_empty() && !config.crawl.recursive {
        println!("! No roots given and not recursive: nothing would be crawled");
    }
}

/// Handles the --stats mode: shows statistics about the cache
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Cache: {}\n", config.cache.directory);

    let store = open_store(Path::new(&config.cache.directory));
    let stats = load_statistics(&store).context("failed to read the cache")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation, then writes the site and report
async fn handle_crawl(config: Config, roots: &[String], no_site: bool) -> anyhow::Result<()> {
    if roots.is_empty() && !config.crawl.recursive {
        tracing::warn!("No pages given and not recursive: nothing to crawl");
    }
    tracing::info!(
        "Starting crawl of {} roots (recursive: {}, history: {}, cache only: {})",
        roots.len(),
        config.crawl.recursive,
        config.crawl.history,
        config.crawl.cache_only
    );

    let fingerprint = fingerprint_config(&config);
    let outcome = match crawl(config.clone(), roots).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!(
        "Crawl completed: {} pages, {} failures",
        outcome.index.page_count(),
        outcome.failures.len()
    );

    let site = if no_site {
        None
    } else {
        let renderer = TextRenderer::new(&config.source.domain)?;
        Some(write_site(&outcome, &config, &renderer)?)
    };

    let report_path = Path::new(&config.output.directory).join("report.md");
    generate_markdown_report(&CrawlReport::new(&outcome, site, &fingerprint), &report_path)?;
    tracing::info!("Report written to {}", report_path.display());

    Ok(())
}
