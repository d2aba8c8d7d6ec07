//! # mrf-sieve - Price Transparency File Sieve
//!
//! Finds the negotiated rates of a small set of providers inside insurer
//! machine-readable files: multi-gigabyte, gzip-compressed JSON documents
//! that never fit in memory.
//!
//! ## Modules
//!
//! - **stream**: Open a location and stream the elements of one nested array
//! - **index**: Scan an index document for the rate files of target plans
//! - **rates**: Two-pass extraction of target-provider rates from a rate file
//! - **checkpoint**: Resumable, crash-safe batches over many rate files
//! - **registry**: Load the identifiers being searched for
//!
//! ## Quick Start
//!
//! ### Discovering rate files
//!
//! ```rust
//! use mrf_sieve::index::{Acceptance, FileFilter, IdentifierMatcher};
//! use mrf_sieve::stream::ByteSource;
//! use mrf_sieve::{scan_index, ScanConfig, TargetIdentifierSet};
//! use std::io::{Cursor, Read};
//!
//! struct Inline(&'static str);
//!
//! impl ByteSource for Inline {
//!     fn open(&self, _location: &str) -> mrf_sieve::Result<Box<dyn Read + Send>> {
//!         Ok(Box::new(Cursor::new(self.0.as_bytes())))
//!     }
//! }
//!
//! # fn main() -> mrf_sieve::Result<()> {
//! let index = Inline(r#"{"reporting_structure": [{
//!     "reporting_plans": [{"plan_id": "58081GA0010001", "plan_name": "Gold PPO"}],
//!     "in_network_files": [{"description": "medical", "location": "https://cdn.test/rates.json.gz"}]
//! }]}"#);
//!
//! let targets = TargetIdentifierSet::new(["58081"], 5);
//! let matcher = IdentifierMatcher::new(targets, Acceptance::Prefix);
//! let report = scan_index(&index, "index.json", &matcher, &FileFilter::permissive(), &ScanConfig::default())?;
//!
//! assert_eq!(report.files[0].location, "https://cdn.test/rates.json.gz");
//! # Ok(())
//! # }
//! ```
//!
//! ### Extracting rates
//!
//! ```rust,no_run
//! use mrf_sieve::checkpoint::{BatchController, CheckpointStore};
//! use mrf_sieve::index::load_discovered;
//! use mrf_sieve::registry::Registry;
//! use mrf_sieve::{ExtractConfig, FetchConfig, Fetcher};
//! use std::path::Path;
//!
//! # fn main() -> mrf_sieve::Result<()> {
//! let files = load_discovered(Path::new("data/discovered_files.json"))?;
//! let targets = Registry::load_hospitals(Path::new("data/hospitals.json"))?.targets(5);
//! let fetcher = Fetcher::new(&FetchConfig::default())?;
//!
//! let store = CheckpointStore::new("data/progress.json", "data/rates.json");
//! let report = BatchController::new(store, &fetcher, &targets, ExtractConfig::default()).run(&files)?;
//! println!("{} files committed", report.committed);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod progress;
pub mod rates;
pub mod registry;
pub mod stream;
pub mod types;

mod persist;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::{ExtractConfig, FetchConfig, ScanConfig};
pub use error::{Result, SieveError};
pub use progress::{Journal, ProgressEvent, ProgressSink, TracingJournal, TracingProgress};
pub use stream::{ByteSource, Compression, Fetcher, JsonPath, JsonStream};
pub use types::{
    DiscoveredFile, Identifier, MatchedPlan, NegotiatedPrice, ProgressMetadata, RateRecord,
    TargetIdentifierSet,
};

use index::{FileFilter, IndexScanner, PlanMatcher, ScanReport, REPORTING_STRUCTURE};

/// Main entry point for discovery: scan the index at `location` for rate files
pub fn scan_index(
    source: &dyn ByteSource,
    location: &str,
    matcher: &dyn PlanMatcher,
    filter: &FileFilter,
    config: &ScanConfig,
) -> Result<ScanReport> {
    let stream = JsonStream::new(source, location, JsonPath::parse(REPORTING_STRUCTURE))
        .with_compression(config.compression);
    IndexScanner::new(matcher, filter, config).scan(&stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Acceptance, IdentifierMatcher, KeywordMatcher};
    use crate::testing::MemorySource;

    const INDEX: &str = r#"{
        "reporting_entity_name": "Example Health",
        "reporting_structure": [
            {"reporting_plans": [{"plan_id": "58081GA0010001", "plan_name": "Gold PPO", "plan_id_type": "HIOS"}],
             "in_network_files": [
                {"description": "in-network medical", "location": "https://cdn.test/gold_rates.json.gz"},
                {"description": "dental in-network", "location": "https://cdn.test/gold_dental.json.gz"}
             ]},
            {"reporting_plans": [{"plan_id": "99999GA0010001", "plan_sponsor_name": "Acme Corp"}],
             "in_network_files": [{"description": "medical", "location": "https://cdn.test/acme.json.gz"}]}
        ]
    }"#;

    #[test]
    fn test_scan_index_by_issuer_prefix() {
        let source = MemorySource::new().with_gzip("index", INDEX);
        let matcher = IdentifierMatcher::new(
            TargetIdentifierSet::new(["58081"], 5),
            Acceptance::Prefix,
        );
        let config = ScanConfig::default();
        let filter = FileFilter::from_config(&config).unwrap();

        let report = scan_index(&source, "index", &matcher, &filter, &config).unwrap();

        assert_eq!(report.entries_scanned, 2);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].plans[0].id, "58081GA0010001");
    }

    #[test]
    fn test_scan_index_by_sponsor_keyword() {
        let source = MemorySource::new().with_gzip("index", INDEX);
        let matcher = KeywordMatcher::new(&["acme".to_string()]).unwrap();
        let config = ScanConfig::default();
        let filter = FileFilter::from_config(&config).unwrap();

        let report = scan_index(&source, "index", &matcher, &filter, &config).unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].location, "https://cdn.test/acme.json.gz");
    }
}
