//! Resumable batch extraction
//!
//! [`CheckpointStore`] owns the two state files of a batch, and
//! [`BatchController`] walks a discovery list through [`RateExtractor`]
//! committing one file at a time.
//!
//! [`RateExtractor`]: crate::rates::RateExtractor

pub mod controller;
pub mod store;

pub use controller::{BatchController, BatchReport, FileFailure};
pub use store::{CheckpointLock, CheckpointStore, ExtractionCheckpoint, ResultsDocument};
