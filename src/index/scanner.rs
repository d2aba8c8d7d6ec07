use crate::config::ScanConfig;
use crate::error::{Result, SieveError};
use crate::index::model::StructureEntry;
use crate::index::policy::{FileFilter, PlanMatcher};
use crate::persist;
use crate::progress::{Cadence, NoProgress, ProgressEvent, ProgressSink};
use crate::stream::JsonStream;
use crate::types::{DiscoveredFile, MatchedPlan};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;

/// Array of an index document holding its structure entries
pub const REPORTING_STRUCTURE: &str = "reporting_structure";

/// Result of one index scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Discovered files in the order they were found
    pub files: Vec<DiscoveredFile>,
    pub entries_scanned: u64,
    pub matched_entries: u64,
    pub cap_reached: bool,
}

/// Streams an index document and collects the rate files of matching entries
pub struct IndexScanner<'a> {
    matcher: &'a dyn PlanMatcher,
    filter: &'a FileFilter,
    discovery_cap: Option<usize>,
    cadence: Cadence,
    progress: &'a dyn ProgressSink,
}

impl<'a> IndexScanner<'a> {
    pub fn new(matcher: &'a dyn PlanMatcher, filter: &'a FileFilter, config: &ScanConfig) -> Self {
        IndexScanner {
            matcher,
            filter,
            discovery_cap: config.discovery_cap,
            cadence: Cadence::new(config.progress_every),
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Scan until the stream ends or the discovery cap is reached.
    ///
    /// Any transport or decode failure aborts the scan; nothing found up to
    /// that point is returned.
    pub fn scan(&self, stream: &JsonStream<'_>) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        stream.for_each(|entry: StructureEntry| {
            report.entries_scanned += 1;
            let flow = self.inspect(entry, &mut seen, &mut report);

            if self.cadence.due(report.entries_scanned) {
                self.progress.on_progress(&ProgressEvent::Index {
                    entries_scanned: report.entries_scanned,
                    matched_entries: report.matched_entries,
                    unique_files: report.files.len(),
                });
            }
            flow
        })?;

        Ok(report)
    }

    fn inspect(
        &self,
        entry: StructureEntry,
        seen: &mut HashSet<String>,
        report: &mut ScanReport,
    ) -> ControlFlow<()> {
        if !self.matcher.may_match(&entry) {
            return ControlFlow::Continue(());
        }
        let plans: Vec<MatchedPlan> = self.matcher.accept(&entry);
        if plans.is_empty() {
            return ControlFlow::Continue(());
        }
        report.matched_entries += 1;

        for file in entry.in_network_files {
            let Some(location) = file.location.filter(|l| !l.trim().is_empty()) else {
                continue;
            };
            if seen.contains(&location) {
                continue;
            }
            let description = file.description.as_deref().unwrap_or_default();
            if !self.filter.admits(&location, description) {
                continue;
            }

            if self.cap_reached(report) {
                return ControlFlow::Break(());
            }
            seen.insert(location.clone());
            report.files.push(DiscoveredFile {
                description: file.description,
                location,
                plans: plans.clone(),
            });

            if self.cap_reached(report) {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Checked before and after each append, so a zero cap collects nothing
    fn cap_reached(&self, report: &mut ScanReport) -> bool {
        report.cap_reached = self.discovery_cap.is_some_and(|cap| report.files.len() >= cap);
        report.cap_reached
    }
}

/// Overwrite the discovery file with `files`
pub fn save_discovered(path: &Path, files: &[DiscoveredFile]) -> Result<()> {
    persist::write_json_atomic(path, files, true)
}

/// Read a discovery file; its absence is a missing-input error
pub fn load_discovered(path: &Path) -> Result<Vec<DiscoveredFile>> {
    persist::read_json(path)?.ok_or_else(|| SieveError::MissingInput {
        path: path.to_path_buf(),
    })
}
