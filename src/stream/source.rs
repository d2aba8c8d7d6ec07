use crate::config::FetchConfig;
use crate::error::{Result, SieveError};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const READ_BUFFER: usize = 256 * 1024;

/// Opens a fresh forward-only byte stream for a location.
///
/// Every call starts from the first byte; callers that need a second pass
/// open again rather than rewinding.
pub trait ByteSource {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>>;
}

/// Opens `http(s)://` locations with a blocking HTTP client and everything
/// else (plain paths, `file://` URLs) from the local filesystem
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.transfer_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SieveError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Fetcher { client })
    }

    fn open_http(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        let transport = |e: reqwest::Error| SieveError::Transport {
            location: url.to_string(),
            message: if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            },
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(Box::new(response))
    }

    fn open_file(location: &str) -> Result<Box<dyn Read + Send>> {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        let file = File::open(path).map_err(|e| SieveError::Transport {
            location: location.to_string(),
            message: format!("cannot open {}: {e}", path.display()),
        })?;
        Ok(Box::new(file))
    }
}

impl ByteSource for Fetcher {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        if is_remote(location) {
            self.open_http(location)
        } else {
            Self::open_file(location)
        }
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.get(..8).unwrap_or(location).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// How the bytes of a source are compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Gzip,
    Identity,
    /// Gzip when the stream starts with the gzip magic bytes
    #[default]
    Auto,
}

impl Compression {
    /// Wrap a raw stream in a buffered, decompressing reader
    pub fn wrap(self, raw: Box<dyn Read + Send>) -> io::Result<Box<dyn BufRead + Send>> {
        let mut buffered = BufReader::with_capacity(READ_BUFFER, raw);
        let gzip = match self {
            Compression::Gzip => true,
            Compression::Identity => false,
            Compression::Auto => buffered.fill_buf()?.starts_with(&GZIP_MAGIC),
        };

        if gzip {
            Ok(Box::new(BufReader::with_capacity(
                READ_BUFFER,
                MultiGzDecoder::new(buffered),
            )))
        } else {
            Ok(Box::new(buffered))
        }
    }
}

impl FromStr for Compression {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Compression::Gzip),
            "identity" | "none" => Ok(Compression::Identity),
            "auto" => Ok(Compression::Auto),
            other => Err(SieveError::InvalidConfig(format!(
                "unknown compression '{other}' (expected gzip, identity or auto)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gzip;
    use std::io::Cursor;

    fn read_all(compression: Compression, bytes: Vec<u8>) -> String {
        let mut out = String::new();
        compression
            .wrap(Box::new(Cursor::new(bytes)))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_auto_detects_gzip_and_plain() {
        assert_eq!(read_all(Compression::Auto, gzip("{\"a\":1}")), "{\"a\":1}");
        assert_eq!(read_all(Compression::Auto, b"[1,2]".to_vec()), "[1,2]");
        assert_eq!(read_all(Compression::Gzip, gzip("[]")), "[]");
    }

    #[test]
    fn test_fetcher_opens_local_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, "[]").unwrap();

        let fetcher = Fetcher::new(&FetchConfig::default()).unwrap();
        let mut text = String::new();
        fetcher
            .open(path.to_str().unwrap())
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "[]");

        let url = format!("file://{}", path.display());
        assert!(fetcher.open(&url).is_ok());

        let missing = fetcher.open(dir.path().join("absent.json").to_str().unwrap());
        assert!(matches!(missing, Err(SieveError::Transport { .. })));
        assert!(missing.err().is_some_and(|e| e.is_retryable()));
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("GZ".parse::<Compression>().unwrap(), Compression::Gzip);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::Identity);
        assert!("brotli".parse::<Compression>().is_err());
        assert!(is_remote("HTTPS://example.test/x"));
        assert!(!is_remote("/tmp/x.json"));
    }
}
