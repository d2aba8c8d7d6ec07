//! Progress events and the run journal
//!
//! Streaming components report counts through a [`ProgressSink`] at a
//! configurable cadence instead of writing to any output themselves. The batch
//! controller narrates its work through a [`Journal`].

use tracing::info;

/// Counts emitted while a long stream is being scanned
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Index scan: entries read, entries whose plans matched, unique files kept
    Index {
        entries_scanned: u64,
        matched_entries: u64,
        unique_files: usize,
    },
    /// Pass 1 over a rate file's provider references
    References {
        location: String,
        scanned: u64,
        matched: usize,
    },
    /// Pass 2 over a rate file's in-network items
    Rates {
        location: String,
        scanned: u64,
        emitted: u64,
    },
}

pub trait ProgressSink {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards events to `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Index {
                entries_scanned,
                matched_entries,
                unique_files,
            } => info!(
                entries_scanned,
                matched_entries, unique_files, "scanning index structures"
            ),
            ProgressEvent::References {
                location,
                scanned,
                matched,
            } => info!(%location, scanned, matched, "scanning provider references"),
            ProgressEvent::Rates {
                location,
                scanned,
                emitted,
            } => info!(%location, scanned, emitted, "scanning in-network rates"),
        }
    }
}

/// Free-form narrative of a batch run
pub trait Journal {
    fn record(&self, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingJournal;

impl Journal for TracingJournal {
    fn record(&self, message: &str) {
        info!(target: "mrf_sieve::journal", "{message}");
    }
}

/// Emits every `every` ticks; `every == 0` disables emission
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cadence {
    every: u64,
}

impl Cadence {
    pub(crate) fn new(every: u64) -> Self {
        Cadence { every }
    }

    pub(crate) fn due(&self, count: u64) -> bool {
        self.every != 0 && count % self.every == 0
    }
}
