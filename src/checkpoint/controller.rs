use crate::checkpoint::store::{CheckpointStore, ExtractionCheckpoint};
use crate::config::ExtractConfig;
use crate::error::Result;
use crate::progress::{Journal, NoProgress, ProgressSink, TracingJournal};
use crate::rates::RateExtractor;
use crate::stream::ByteSource;
use crate::types::{file_name_of, DiscoveredFile, ProgressMetadata, RateRecord, TargetIdentifierSet};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A rate file that could not be processed in this batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub location: String,
    pub error: String,
    pub retryable: bool,
}

/// Tally of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Distinct locations in the discovery list
    pub files_known: usize,
    /// Locations already checkpointed before this run started
    pub already_processed: usize,
    pub attempted: usize,
    pub committed: usize,
    /// Committed files with no target provider in them
    pub without_matches: usize,
    pub failed: Vec<FileFailure>,
    /// Records dropped at start-up because their file never reached the checkpoint
    pub reconciled: usize,
    pub records_added: u64,
    pub total_records: usize,
}

/// Drives extraction across a discovery list with crash-safe resumption.
///
/// Each file is committed in two steps: the results file is rewritten with
/// the file's records, then the checkpoint gains its location. A crash in
/// between leaves records the checkpoint does not vouch for; the next run
/// drops them and processes the file again.
pub struct BatchController<'a> {
    store: CheckpointStore,
    source: &'a dyn ByteSource,
    targets: &'a TargetIdentifierSet,
    config: ExtractConfig,
    progress: &'a dyn ProgressSink,
    journal: &'a dyn Journal,
}

impl<'a> BatchController<'a> {
    pub fn new(
        store: CheckpointStore,
        source: &'a dyn ByteSource,
        targets: &'a TargetIdentifierSet,
        config: ExtractConfig,
    ) -> Self {
        BatchController {
            store,
            source,
            targets,
            config,
            progress: &NoProgress,
            journal: &TracingJournal,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_journal(mut self, journal: &'a dyn Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Process the next batch of unprocessed files.
    ///
    /// Per-file failures are recorded in the report and do not stop the batch.
    /// Errors returned from here concern the batch as a whole: the checkpoint
    /// is held by another run, or the state files cannot be read.
    pub fn run(&self, files: &[DiscoveredFile]) -> Result<BatchReport> {
        let _lock = self.store.lock()?;
        let mut checkpoint = self.store.load_checkpoint()?;
        let mut results = self.store.load_results()?;
        let mut report = BatchReport::default();

        let before = results.len();
        results.retain(|record| checkpoint.contains(&record.source_location));
        report.reconciled = before - results.len();
        if report.reconciled > 0 {
            self.journal.record(&format!(
                "Dropped {} records from files missing in the checkpoint",
                report.reconciled
            ));
        }

        let mut seen = HashSet::new();
        let locations: Vec<&str> = files
            .iter()
            .map(|file| file.location.as_str())
            .filter(|location| seen.insert(*location))
            .collect();
        report.files_known = locations.len();
        report.already_processed = locations.iter().filter(|l| checkpoint.contains(l)).count();

        let pending: Vec<&str> = locations
            .into_iter()
            .filter(|location| !checkpoint.contains(location))
            .take(self.config.limit_files.unwrap_or(usize::MAX))
            .collect();

        if pending.is_empty() {
            self.journal.record("No new files to process in this batch.");
            report.total_records = results.len();
            return Ok(report);
        }

        self.journal.record(&format!(
            "{} of {} files already processed; {} in this batch",
            report.already_processed,
            report.files_known,
            pending.len()
        ));

        let extractor =
            RateExtractor::new(self.source, self.targets, &self.config).with_progress(self.progress);

        for location in pending {
            report.attempted += 1;
            self.journal.record(&format!(
                "[{}/{}] Processing {}",
                report.already_processed + report.attempted,
                report.files_known,
                file_name_of(location)
            ));

            let mut file_records = Vec::new();
            let outcome = extractor
                .extract(location, |record| file_records.push(record))
                .and_then(|extraction| {
                    self.commit(location, file_records, &mut results, &mut checkpoint, report.files_known)
                        .map(|added| (extraction, added))
                });

            match outcome {
                Ok((extraction, added)) => {
                    report.committed += 1;
                    report.records_added += added;
                    if extraction.is_empty_match() {
                        report.without_matches += 1;
                        self.journal
                            .record("  No matching providers in this file; marked processed");
                    } else {
                        self.journal.record(&format!(
                            "  {} reference groups matched; {} records saved",
                            extraction.matched_groups, added
                        ));
                    }
                }
                Err(e) => {
                    warn!(%location, error = %e, retryable = e.is_retryable(), "rate file failed");
                    self.journal.record(&format!("  Error processing file: {e}"));
                    report.failed.push(FileFailure {
                        location: location.to_string(),
                        error: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                }
            }
        }

        report.total_records = results.len();
        self.journal.record(&format!(
            "Batch complete: {} files committed, {} failed, {} records in total",
            report.committed,
            report.failed.len(),
            report.total_records
        ));
        Ok(report)
    }

    /// Write results first, checkpoint second. On failure the in-memory state
    /// is restored so later files commit against what is actually on disk.
    fn commit(
        &self,
        location: &str,
        records: Vec<RateRecord>,
        results: &mut Vec<RateRecord>,
        checkpoint: &mut ExtractionCheckpoint,
        files_known: usize,
    ) -> Result<u64> {
        let added = records.len() as u64;
        results.retain(|record| record.source_location != location);
        let kept = results.len();
        results.extend(records);

        let mut next = checkpoint.clone();
        next.mark_processed(location);
        let metadata = ProgressMetadata {
            last_updated: Utc::now(),
            total_files_in_index: files_known,
            files_processed: next.len(),
            total_rates_found: results.len(),
        };

        let saved = self
            .store
            .save_results(&metadata, results)
            .and_then(|()| self.store.save_checkpoint(&next));
        if let Err(e) = saved {
            results.truncate(kept);
            return Err(e);
        }

        debug!(%location, added, total = results.len(), "committed rate file");
        *checkpoint = next;
        Ok(added)
    }
}
