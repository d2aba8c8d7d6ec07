//! Fixtures shared by unit tests

use crate::error::{Result, SieveError};
use crate::stream::ByteSource;
use flate2::write::GzEncoder;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// In-memory documents keyed by location; counts how often each is opened
#[derive(Default)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
    opens: RefCell<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gzip(mut self, location: &str, json: &str) -> Self {
        self.documents.insert(location.to_string(), gzip(json));
        self
    }

    pub fn with_bytes(mut self, location: &str, bytes: Vec<u8>) -> Self {
        self.documents.insert(location.to_string(), bytes);
        self
    }

    pub fn opens(&self, location: &str) -> usize {
        self.opens.borrow().get(location).copied().unwrap_or(0)
    }
}

impl ByteSource for MemorySource {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        *self.opens.borrow_mut().entry(location.to_string()).or_default() += 1;
        match self.documents.get(location) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(SieveError::Transport {
                location: location.to_string(),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}
