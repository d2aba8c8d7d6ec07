//! Discovery of relevant rate files from a payer's index document
//!
//! The index (table of contents) file lists `reporting_structure` entries,
//! each pairing a set of plans with the in-network rate files covering them.
//! Matches are rare and the file is huge, so entries are rejected with a cheap
//! test before anything else is examined.

pub mod model;
pub mod policy;
pub mod scanner;

pub use model::{FileDescriptor, ReportingPlan, StructureEntry};
pub use policy::{Acceptance, FileFilter, IdentifierMatcher, KeywordMatcher, PlanMatcher};
pub use scanner::{load_discovered, save_discovered, IndexScanner, ScanReport, REPORTING_STRUCTURE};
