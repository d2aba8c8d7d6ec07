use crate::error::{Result, SieveError};
use crate::persist;
use crate::types::{ProgressMetadata, RateRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

/// Locations whose results are durably on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCheckpoint {
    #[serde(default)]
    processed_urls: BTreeSet<String>,
}

impl ExtractionCheckpoint {
    pub fn contains(&self, location: &str) -> bool {
        self.processed_urls.contains(location)
    }

    pub fn mark_processed(&mut self, location: &str) -> bool {
        self.processed_urls.insert(location.to_string())
    }

    pub fn len(&self) -> usize {
        self.processed_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.processed_urls.iter().map(String::as_str)
    }
}

/// Contents of the results file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultsDocument {
    pub metadata: ProgressMetadata,
    #[serde(default)]
    pub results: Vec<RateRecord>,
}

#[derive(Serialize)]
struct ResultsDocumentRef<'a> {
    metadata: &'a ProgressMetadata,
    results: &'a [RateRecord],
}

/// Exclusive hold on a checkpoint; released on drop or process exit
#[derive(Debug)]
pub struct CheckpointLock {
    _file: File,
}

/// On-disk state of an extraction batch: the checkpoint file and the results
/// file it vouches for
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    results_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(checkpoint_path: impl Into<PathBuf>, results_path: impl Into<PathBuf>) -> Self {
        CheckpointStore {
            checkpoint_path: checkpoint_path.into(),
            results_path: results_path.into(),
        }
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Take the advisory lock guarding this checkpoint against a concurrent run
    pub fn lock(&self) -> Result<CheckpointLock> {
        let mut name = self.checkpoint_path.as_os_str().to_owned();
        name.push(".lock");
        let lock_path = PathBuf::from(name);

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SieveError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| SieveError::io(&lock_path, e))?;

        match file.try_lock() {
            Ok(()) => Ok(CheckpointLock { _file: file }),
            Err(TryLockError::WouldBlock) => Err(SieveError::CheckpointLocked {
                path: self.checkpoint_path.clone(),
            }),
            Err(TryLockError::Error(e)) => Err(SieveError::io(&lock_path, e)),
        }
    }

    /// Missing file means nothing was processed yet
    pub fn load_checkpoint(&self) -> Result<ExtractionCheckpoint> {
        Ok(persist::read_json(&self.checkpoint_path)?.unwrap_or_default())
    }

    pub fn save_checkpoint(&self, checkpoint: &ExtractionCheckpoint) -> Result<()> {
        persist::write_json_atomic(&self.checkpoint_path, checkpoint, false)
    }

    pub fn load_results(&self) -> Result<Vec<RateRecord>> {
        let document: Option<ResultsDocument> = persist::read_json(&self.results_path)?;
        Ok(document.map(|doc| doc.results).unwrap_or_default())
    }

    pub fn load_metadata(&self) -> Result<Option<ProgressMetadata>> {
        let document: Option<ResultsDocument> = persist::read_json(&self.results_path)?;
        Ok(document.map(|doc| doc.metadata))
    }

    pub fn save_results(&self, metadata: &ProgressMetadata, results: &[RateRecord]) -> Result<()> {
        persist::write_json_atomic(
            &self.results_path,
            &ResultsDocumentRef { metadata, results },
            true,
        )
    }
}
