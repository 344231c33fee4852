//! Seq-Harvest main entry point
//!
//! This is the command-line interface for the Seq-Harvest record harvester.

use clap::Parser;
use seq_harvest::config::{load_config_with_hash, Config};
use seq_harvest::harvester::harvest;
use seq_harvest::output::{load_statistics, print_statistics, sort_store};
use seq_harvest::storage::CsvStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Seq-Harvest: a sequential-ID record harvester
///
/// Walks a remote source's numeric ID space in batches, stores each record
/// it finds in a deduplicated CSV file, and rolls back and retries when the
/// source appears to go down.
#[derive(Parser, Debug)]
#[command(name = "seq-harvest")]
#[command(version)]
#[command(about = "A sequential-ID record harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from the configured start ID instead of after the last stored record
    #[arg(long)]
    fresh: bool,

    /// Fetch as usual but only log what would be written
    #[arg(long, conflicts_with_all = ["stats", "sort"])]
    dry_run: bool,

    /// Show statistics for the record store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "sort"])]
    stats: bool,

    /// Rewrite the record store sorted by ID without duplicates, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    sort: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.fresh {
        config.harvest.resume = false;
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.sort {
        handle_sort(&config)?;
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seq_harvest=info,warn"),
            1 => EnvFilter::new("seq_harvest=debug,info"),
            2 => EnvFilter::new("seq_harvest=trace,debug"),
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

/// Handles the --stats mode
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Store: {}\n", config.output.file);

    let store = CsvStore::new(&config.output.file);
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --sort mode
fn handle_sort(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = CsvStore::new(&config.output.file).with_dry_run(config.output.dry_run);
    let removed = sort_store(&mut store)?;

    println!("✓ Sorted {} ({} duplicate rows removed)", config.output.file, removed);
    Ok(())
}

/// Handles the main harvest operation
///
/// The harvest only returns on a fatal error; Ctrl-C stops it cleanly.
async fn handle_harvest(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Strategy: {}, batch size: {}, empty-batch threshold: {}, store: {} ({:?}{})",
        config.fetch.strategy.as_str(),
        config.harvest.batch_size,
        config.harvest.empty_batch_threshold,
        config.output.file,
        config.output.mode,
        if config.output.dry_run { ", dry run" } else { "" }
    );

    tokio::select! {
        result = harvest(config) => {
            if let Err(e) = result {
                tracing::error!("Harvest failed: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping harvest");
        }
    }

    Ok(())
}
