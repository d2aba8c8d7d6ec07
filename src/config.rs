use crate::stream::Compression;
use std::time::Duration;

/// Settings for an index scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Stop once this many unique files were found (`None` scans everything)
    pub discovery_cap: Option<usize>,

    /// Emit a progress event every N structures (0 disables)
    pub progress_every: u64,

    /// Case-insensitive keywords that drop a file when found in its description
    pub exclude_keywords: Vec<String>,

    /// A file is kept when its location contains one of these...
    pub location_markers: Vec<String>,

    /// ...or its description contains one of these
    pub description_markers: Vec<String>,

    pub compression: Compression,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            discovery_cap: Some(50),
            progress_every: 10_000,
            exclude_keywords: to_strings(&["vision", "dental", "pharmacy", "behavioral"]),
            location_markers: to_strings(&["in-network-rates", "negotiated-rates"]),
            description_markers: to_strings(&["medical"]),
            compression: Compression::Auto,
        }
    }
}

/// Settings for a batch of rate-file extractions
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Maximum number of pending files handled in one run (`None` = all)
    pub limit_files: Option<usize>,

    /// Emit a progress event every N streamed elements (0 disables)
    pub progress_every: u64,

    pub compression: Compression,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            limit_files: Some(5),
            progress_every: 10_000,
            compression: Compression::Auto,
        }
    }
}

/// Network settings for remote sources
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,

    /// Upper bound on a whole transfer; `None` disables it
    pub transfer_timeout: Option<Duration>,

    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            connect_timeout: Duration::from_secs(60),
            transfer_timeout: Some(Duration::from_secs(4 * 60 * 60)),
            user_agent: format!("mrf-sieve/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
