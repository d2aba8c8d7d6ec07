use crate::config::ExtractConfig;
use crate::error::Result;
use crate::progress::{NoProgress, ProgressSink};
use crate::rates::joiner::RateJoiner;
use crate::rates::matcher::ReferenceMatcher;
use crate::rates::model::{IN_NETWORK, PROVIDER_REFERENCES};
use crate::stream::{ByteSource, Compression, JsonPath, JsonStream};
use crate::types::{RateRecord, TargetIdentifierSet};

/// What extraction found in one rate file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileExtraction {
    /// Reference groups pointing at a target provider
    pub matched_groups: usize,
    /// In-network items read in pass 2 (0 when pass 2 was skipped)
    pub items_scanned: u64,
    pub records: u64,
}

impl FileExtraction {
    /// No target provider appears in the file; pass 2 never ran
    pub fn is_empty_match(&self) -> bool {
        self.matched_groups == 0
    }
}

/// Runs both passes over one rate file.
///
/// Pure with respect to local state: records only leave through `emit`.
pub struct RateExtractor<'a> {
    source: &'a dyn ByteSource,
    targets: &'a TargetIdentifierSet,
    compression: Compression,
    progress_every: u64,
    progress: &'a dyn ProgressSink,
}

impl<'a> RateExtractor<'a> {
    pub fn new(
        source: &'a dyn ByteSource,
        targets: &'a TargetIdentifierSet,
        config: &ExtractConfig,
    ) -> Self {
        RateExtractor {
            source,
            targets,
            compression: config.compression,
            progress_every: config.progress_every,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn extract<F>(&self, location: &str, emit: F) -> Result<FileExtraction>
    where
        F: FnMut(RateRecord),
    {
        let references = JsonStream::new(self.source, location, JsonPath::parse(PROVIDER_REFERENCES))
            .with_compression(self.compression);
        let membership = ReferenceMatcher::new(self.targets, self.progress_every)
            .with_progress(self.progress)
            .build(&references)?;

        if membership.is_empty() {
            return Ok(FileExtraction::default());
        }

        let summary = RateJoiner::new(&membership, self.progress_every)
            .with_progress(self.progress)
            .join(&references.at(JsonPath::parse(IN_NETWORK)), emit)?;

        Ok(FileExtraction {
            matched_groups: membership.len(),
            items_scanned: summary.items_scanned,
            records: summary.records,
        })
    }
}
