//! Streaming access to large compressed JSON documents
//!
//! A [`ByteSource`] opens a location (HTTP URL or local path) as a raw byte
//! stream; a [`JsonStream`] decompresses it and hands the elements of one
//! nested array to a caller, one at a time, in bounded memory.

pub mod decoder;
pub mod source;

pub use decoder::{JsonPath, JsonStream, StreamOutcome};
pub use source::{ByteSource, Compression, Fetcher};
