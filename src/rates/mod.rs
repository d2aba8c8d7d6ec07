//! Two-pass extraction of negotiated rates from a rate file
//!
//! Rate files name providers once, in `provider_references`, and refer to
//! those groups by id from every `in_network` item. Pass 1 collects the ids of
//! groups containing a target NPI; pass 2 re-opens the file and keeps only the
//! items priced for one of those groups.

pub mod extractor;
pub mod joiner;
pub mod matcher;
pub mod model;

pub use extractor::{FileExtraction, RateExtractor};
pub use joiner::{JoinSummary, RateJoiner};
pub use matcher::{ReferenceMatcher, ReferenceMembership};
pub use model::{IN_NETWORK, PROVIDER_REFERENCES};
