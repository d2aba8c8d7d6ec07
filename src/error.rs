use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = SieveError> = std::result::Result<T, E>;

/// Errors surfaced by the scanning and extraction pipeline
#[derive(Debug, Error)]
pub enum SieveError {
    /// Network failure, non-success status or timeout while fetching a source
    #[error("transport error for {location}: {message}")]
    Transport { location: String, message: String },

    /// Malformed compressed stream or unexpected JSON shape at the scanned path
    #[error("decode error for {location}: {message}")]
    Decode { location: String, message: String },

    /// A required input (registry, discovery file) does not exist
    #[error("missing input file: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A state file exists but could not be parsed or serialized
    #[error("failed to (de)serialize {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Another run holds the lock on this checkpoint
    #[error("checkpoint {} is locked by another run", path.display())]
    CheckpointLocked { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SieveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SieveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SieveError::Persist {
            path: path.into(),
            source,
        }
    }

    /// Whether re-running the same step later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SieveError::Transport { .. } | SieveError::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let transport = SieveError::Transport {
            location: "https://example.test/a.json.gz".into(),
            message: "timed out".into(),
        };
        assert!(transport.is_retryable());

        let missing = SieveError::MissingInput {
            path: PathBuf::from("data/hospitals.json"),
        };
        assert!(!missing.is_retryable());
        assert_eq!(missing.to_string(), "missing input file: data/hospitals.json");
    }
}
