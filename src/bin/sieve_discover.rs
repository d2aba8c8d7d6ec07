//! sieve-discover: Find the rate files of target plans in an index document
//!
//! Usage:
//!   # Plans of every issuer in a registry (matched on the 5-character issuer prefix)
//!   sieve-discover https://payer.test/index.json.gz --issuers data/issuers.json
//!
//!   # Only these exact plan ids
//!   sieve-discover index.json.gz --plan-id 58081GA0010001 --exact
//!
//!   # Plans whose name or sponsor mentions a keyword
//!   sieve-discover index.json.gz --keyword georgia --keyword emory --cap 0

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mrf_sieve::index::{
    save_discovered, Acceptance, FileFilter, IdentifierMatcher, IndexScanner, KeywordMatcher,
    PlanMatcher, REPORTING_STRUCTURE,
};
use mrf_sieve::logging::init_tracing;
use mrf_sieve::registry::Registry;
use mrf_sieve::types::DEFAULT_PREFIX_LEN;
use mrf_sieve::{Compression, FetchConfig, Fetcher, JsonPath, JsonStream, ScanConfig, TracingProgress};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sieve-discover")]
#[command(about = "Scan an index document for the rate files of target plans", long_about = None)]
struct Args {
    /// Index document: http(s) URL, file:// URL or local path
    #[arg(value_name = "INDEX", env = "SIEVE_INDEX_URL")]
    index: String,

    /// Issuer registry JSON (`[{"issuer_id": ..., "name": ...}]`)
    #[arg(long, env = "SIEVE_ISSUERS")]
    issuers: Option<PathBuf>,

    /// Target plan or issuer id (repeatable)
    #[arg(long = "plan-id", value_name = "ID")]
    plan_ids: Vec<String>,

    /// Match plan and sponsor names against keywords instead of ids (repeatable)
    #[arg(long = "keyword", value_name = "WORD")]
    keywords: Vec<String>,

    /// Require the full plan id to be a target, not only its issuer prefix
    #[arg(long)]
    exact: bool,

    /// Leading characters of a plan id that identify its issuer
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN)]
    prefix_len: usize,

    /// Stop after this many unique files (0 scans the whole index)
    #[arg(long, env = "SIEVE_DISCOVERY_CAP", default_value_t = 50)]
    cap: usize,

    /// Keep every file of a matched entry, skipping keyword filtering
    #[arg(long)]
    all_files: bool,

    /// Compression of the index: auto, gzip or identity
    #[arg(long, default_value = "auto")]
    compression: Compression,

    /// Overall transfer timeout in seconds (0 disables)
    #[arg(long, env = "SIEVE_TRANSFER_TIMEOUT", default_value_t = 4 * 60 * 60)]
    transfer_timeout: u64,

    /// Output discovery file
    #[arg(long, short = 'o', env = "SIEVE_DISCOVERED", default_value = "data/discovered_files.json")]
    output: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "SIEVE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = ScanConfig {
        discovery_cap: (args.cap > 0).then_some(args.cap),
        compression: args.compression,
        ..ScanConfig::default()
    };

    let matcher: Box<dyn PlanMatcher> = if args.keywords.is_empty() {
        let mut registry = Registry::from_identifiers("command line", &args.plan_ids);
        if let Some(path) = &args.issuers {
            let issuers = Registry::load_issuers(path)
                .with_context(|| format!("Failed to load issuer registry {}", path.display()))?;
            registry.merge(issuers);
        }
        if registry.is_empty() {
            bail!("no targets: pass --issuers, --plan-id or --keyword");
        }

        let acceptance = if args.exact { Acceptance::Exact } else { Acceptance::Prefix };
        info!(groups = registry.groups().len(), ?acceptance, "matching plans by identifier");
        Box::new(IdentifierMatcher::new(registry.targets(args.prefix_len), acceptance))
    } else {
        info!(keywords = ?args.keywords, "matching plans by name");
        Box::new(KeywordMatcher::new(&args.keywords)?)
    };

    let filter = if args.all_files {
        FileFilter::permissive()
    } else {
        FileFilter::from_config(&config)?
    };

    let fetcher = Fetcher::new(&FetchConfig {
        transfer_timeout: (args.transfer_timeout > 0).then(|| Duration::from_secs(args.transfer_timeout)),
        ..FetchConfig::default()
    })?;

    let stream = JsonStream::new(&fetcher, &args.index, JsonPath::parse(REPORTING_STRUCTURE))
        .with_compression(config.compression);
    let report = IndexScanner::new(matcher.as_ref(), &filter, &config)
        .with_progress(&TracingProgress)
        .scan(&stream)
        .with_context(|| format!("Failed to scan index {}", args.index))?;

    if report.cap_reached {
        warn!(cap = args.cap, "discovery cap reached; index not scanned to the end");
    }
    save_discovered(&args.output, &report.files)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        entries_scanned = report.entries_scanned,
        matched_entries = report.matched_entries,
        files = report.files.len(),
        output = %args.output.display(),
        "discovery complete"
    );
    Ok(())
}
