//! Company-Crawler main entry point
//!
//! This is the command-line interface for the incremental company crawler.

use anyhow::{bail, Context};
use clap::Parser;
use company_crawler::config::{
    builtin_targets, load_targets_with_hash, select_targets, validate_run_options,
    validate_targets, CrawlTarget, DatabaseSettings, RunOptions,
};
use company_crawler::output::{load_statistics, print_statistics, print_summary};
use company_crawler::run_company;
use company_crawler::storage::{open_storage, Storage};
use futures::future::join_all;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Company-Crawler: incremental crawler for public company websites
///
/// Crawls the sites of the selected companies, downloads every document they
/// link to, expands ZIP archives, and stores pages and documents in one SQLite
/// table per company. URLs processed by earlier runs are skipped unless --force
/// is given.
#[derive(Parser, Debug)]
#[command(name = "company-crawler")]
#[command(version)]
#[command(about = "Incremental crawler for public company websites", long_about = None)]
struct Cli {
    /// Companies to process (imbel, ceitec, telebras or all)
    #[arg(long, alias = "empresas", num_args = 1.., value_name = "KEY", default_value = "all")]
    companies: Vec<String>,

    /// Reprocess every page and document, even those stored by earlier runs
    #[arg(long)]
    force: bool,

    /// Process companies one after another instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Probe unclassified links with HEAD to avoid fetching documents as pages
    #[arg(long)]
    skip_browser: bool,

    /// Accept invalid TLS certificates on every site
    #[arg(long)]
    no_ssl_verify: bool,

    /// Ignore the flat-file URL cache
    #[arg(long)]
    no_cache: bool,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,

    /// TOML file replacing the built-in targets
    #[arg(long, value_name = "FILE", env = "CRAWLER_TARGETS")]
    targets: Option<PathBuf>,

    /// Root of the per-company output tree
    #[arg(long, value_name = "DIR", env = "CRAWLER_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory of the URL cache files
    #[arg(long, value_name = "DIR", env = "CRAWLER_CACHE_DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Show the selected targets and exit without crawling
    #[arg(long, conflicts_with = "stats")]
    list: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "list")]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; the variables may come from the environment
    let _ = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);

    let (available, targets_hash) = match &cli.targets {
        Some(path) => {
            tracing::info!("Loading targets from: {}", path.display());
            let (targets, hash) = load_targets_with_hash(path)
                .with_context(|| format!("invalid targets file {}", path.display()))?;
            tracing::info!("Targets loaded successfully (hash: {})", hash);
            (targets, Some(hash))
        }
        None => {
            let targets = builtin_targets();
            validate_targets(&targets).context("invalid built-in targets")?;
            (targets, None)
        }
    };

    let selected = select_targets(&available, &cli.companies)?;

    if cli.list {
        handle_list(&selected);
        return Ok(());
    }

    let db = DatabaseSettings::from_env().context("database settings")?;

    if cli.stats {
        return handle_stats(&db, &selected);
    }

    let options = RunOptions {
        force: cli.force,
        skip_browser: cli.skip_browser,
        no_ssl_verify: cli.no_ssl_verify,
        use_cache: !cli.no_cache,
        output_dir: cli.output_dir.clone(),
        cache_dir: cli.cache_dir.clone(),
        targets_hash,
        ..Default::default()
    };
    let options = with_download_timeout(options, cli.timeout);
    validate_run_options(&options)?;

    handle_crawl(&selected, &options, &db, cli.sequential).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when it is set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("company_crawler=info,warn"),
                1 => EnvFilter::new("company_crawler=debug,info"),
                2 => EnvFilter::new("company_crawler=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn with_download_timeout(mut options: RunOptions, secs: u64) -> RunOptions {
    if secs > 0 {
        options.download.timeout = Duration::from_secs(secs);
        tracing::info!("Download timeout set to {} seconds", secs);
    }
    options
}

/// Handles --list: shows the selected targets
fn handle_list(targets: &[CrawlTarget]) {
    println!("=== Company-Crawler Targets ===\n");

    for target in targets {
        println!("{}", target.key);
        println!("  URL: {}", target.url);
        println!("  Table: {}", target.table);
        println!(
            "  Max depth: {}, max pages: {}, max connections: {}",
            target.max_depth, target.max_pages, target.max_connections
        );
        println!("  External links: {}", target.include_external);
        if !target.excluded_tags.is_empty() {
            println!("  Excluded tags: {}", target.excluded_tags.join(", "));
        }
        if !target.excluded_selector.is_empty() {
            println!("  Excluded selector: {}", target.excluded_selector);
        }
        if target.ignore_ssl_errors || target.fragile_server {
            println!(
                "  TLS errors ignored: {}, fragile server: {}",
                target.ignore_ssl_errors, target.fragile_server
            );
        }
        println!();
    }

    println!("✓ Would crawl {} companies", targets.len());
}

/// Handles --stats: shows stored counts and recent runs
fn handle_stats(db: &DatabaseSettings, targets: &[CrawlTarget]) -> anyhow::Result<()> {
    println!("Database: {}\n", db.path.display());

    let mut storage = open_storage(&db.path)
        .with_context(|| format!("cannot open database {}", db.path.display()))?;

    for target in targets {
        storage.ensure_table(&target.table)?;
        let stats = load_statistics(&storage, target)?;
        print_statistics(&stats);
    }

    Ok(())
}

/// Runs every selected company, concurrently unless `sequential` is set
async fn handle_crawl(
    targets: &[CrawlTarget],
    options: &RunOptions,
    db: &DatabaseSettings,
    sequential: bool,
) -> anyhow::Result<()> {
    let results = if sequential {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let result = run_company(target, options, db).await;
            tracing::info!("Finished sequential processing of {}", target.key);
            results.push(result);
        }
        results
    } else {
        tracing::info!("Processing {} companies concurrently", targets.len());
        join_all(targets.iter().map(|target| run_company(target, options, db))).await
    };

    let mut failed = Vec::new();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(summary) => print_summary(&summary),
            Err(e) => {
                tracing::error!("Run for {} failed: {}", target.key, e);
                failed.push(target.key.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!("runs failed for: {}", failed.join(", "));
    }

    Ok(())
}
