//! sieve-extract: Pull target-provider rates out of discovered rate files
//!
//! Processes the next batch of unprocessed files and exits; run it again to
//! continue. Progress survives crashes and interrupted runs.
//!
//! Usage:
//!   sieve-extract --hospitals data/hospitals.json
//!   sieve-extract --limit 0 --npi 1992799050

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mrf_sieve::checkpoint::{BatchController, CheckpointStore};
use mrf_sieve::index::load_discovered;
use mrf_sieve::logging::init_tracing;
use mrf_sieve::registry::Registry;
use mrf_sieve::types::DEFAULT_PREFIX_LEN;
use mrf_sieve::{Compression, ExtractConfig, FetchConfig, Fetcher, TracingJournal, TracingProgress};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sieve-extract")]
#[command(about = "Extract negotiated rates for target providers, one resumable batch at a time", long_about = None)]
struct Args {
    /// Discovery file written by sieve-discover
    #[arg(long, env = "SIEVE_DISCOVERED", default_value = "data/discovered_files.json")]
    discovered: PathBuf,

    /// Hospital registry JSON (`[{"npi": ..., "name": ...}]`)
    #[arg(long, env = "SIEVE_HOSPITALS")]
    hospitals: Option<PathBuf>,

    /// Target provider NPI (repeatable)
    #[arg(long = "npi", value_name = "NPI")]
    npis: Vec<String>,

    /// Results file
    #[arg(long, env = "SIEVE_RESULTS", default_value = "data/extracted_rates.json")]
    results: PathBuf,

    /// Checkpoint file
    #[arg(long, env = "SIEVE_CHECKPOINT", default_value = "data/extraction_progress.json")]
    checkpoint: PathBuf,

    /// Files to process in this run (0 processes every pending file)
    #[arg(long, short = 'n', env = "SIEVE_LIMIT", default_value_t = 5)]
    limit: usize,

    /// Report progress every N streamed elements (0 disables)
    #[arg(long, default_value_t = 10_000)]
    progress_every: u64,

    /// Compression of the rate files: auto, gzip or identity
    #[arg(long, default_value = "auto")]
    compression: Compression,

    /// Overall transfer timeout per file in seconds (0 disables)
    #[arg(long, env = "SIEVE_TRANSFER_TIMEOUT", default_value_t = 4 * 60 * 60)]
    transfer_timeout: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "SIEVE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut registry = Registry::from_identifiers("command line", &args.npis);
    if let Some(path) = &args.hospitals {
        let hospitals = Registry::load_hospitals(path)
            .with_context(|| format!("Failed to load hospital registry {}", path.display()))?;
        if !hospitals.rejected().is_empty() {
            warn!(rejected = ?hospitals.rejected(), "ignoring malformed NPIs");
        }
        registry.merge(hospitals);
    }
    if registry.is_empty() {
        bail!("no target providers: pass --hospitals or --npi");
    }
    let targets = registry.targets(DEFAULT_PREFIX_LEN);
    info!(providers = targets.len(), hospitals = registry.groups().len(), "loaded targets");

    let files = load_discovered(&args.discovered)
        .with_context(|| format!("Failed to load discovery file {}", args.discovered.display()))?;

    let fetcher = Fetcher::new(&FetchConfig {
        transfer_timeout: (args.transfer_timeout > 0).then(|| Duration::from_secs(args.transfer_timeout)),
        ..FetchConfig::default()
    })?;
    let config = ExtractConfig {
        limit_files: (args.limit > 0).then_some(args.limit),
        progress_every: args.progress_every,
        compression: args.compression,
    };

    let store = CheckpointStore::new(&args.checkpoint, &args.results);
    let report = BatchController::new(store, &fetcher, &targets, config)
        .with_progress(&TracingProgress)
        .with_journal(&TracingJournal)
        .run(&files)
        .context("Extraction batch failed")?;

    for failure in &report.failed {
        warn!(location = %failure.location, retryable = failure.retryable, "not processed: {}", failure.error);
    }
    info!(
        files_known = report.files_known,
        already_processed = report.already_processed,
        committed = report.committed,
        without_matches = report.without_matches,
        failed = report.failed.len(),
        records_added = report.records_added,
        total_records = report.total_records,
        "batch finished"
    );
    Ok(())
}
