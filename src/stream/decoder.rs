use crate::error::{Result, SieveError};
use crate::stream::source::{ByteSource, Compression};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserializer;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::ops::ControlFlow;

/// Marker error used to unwind out of the parser when the caller stops early
const STOP_SIGNAL: &str = "mrf-sieve: stream stopped by caller";

/// Dotted object-key path to the array whose elements are streamed.
///
/// `"reporting_structure"` selects the top-level key; `"a.b"` selects key `b`
/// of the object under `a`. The empty path selects a top-level array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath(Vec<String>);

impl JsonPath {
    pub fn parse(dotted: &str) -> Self {
        JsonPath(
            dotted
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn root() -> Self {
        JsonPath(Vec::new())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for JsonPath {
    fn from(dotted: &str) -> Self {
        JsonPath::parse(dotted)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("$")
        } else {
            write!(f, "$.{}", self.0.join("."))
        }
    }
}

/// What a single pass over a stream saw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    /// Elements handed to the caller
    pub items: u64,
    /// Whether an array existed at the path
    pub path_found: bool,
    /// Whether the caller ended the pass before the array was exhausted
    pub stopped_early: bool,
}

/// Lazy, forward-only view of the elements of one array inside a
/// (possibly compressed) JSON document.
///
/// Nothing outside the selected array is materialized: sibling values are
/// skipped token by token, and each element is deserialized, handed to the
/// caller and dropped before the next one is read.
pub struct JsonStream<'s> {
    source: &'s dyn ByteSource,
    location: String,
    path: JsonPath,
    compression: Compression,
}

impl<'s> JsonStream<'s> {
    pub fn new(source: &'s dyn ByteSource, location: impl Into<String>, path: JsonPath) -> Self {
        JsonStream {
            source,
            location: location.into(),
            path,
            compression: Compression::default(),
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Same document, different array
    pub fn at(&self, path: JsonPath) -> JsonStream<'s> {
        JsonStream {
            source: self.source,
            location: self.location.clone(),
            path,
            compression: self.compression,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Open the source and feed every element at the path to `visit`.
    ///
    /// Each call is an independent pass starting from a freshly opened stream.
    /// A missing path yields `Ok` with `path_found == false`; transport and
    /// decode failures are errors.
    pub fn for_each<T, F>(&self, visit: F) -> Result<StreamOutcome>
    where
        T: DeserializeOwned,
        F: FnMut(T) -> ControlFlow<()>,
    {
        let raw = self.source.open(&self.location)?;
        let reader = self
            .compression
            .wrap(raw)
            .map_err(|e| self.io_failure(e))?;

        let mut walk = Walk {
            visit,
            outcome: StreamOutcome::default(),
            _item: PhantomData,
        };
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        let result = PathSeed {
            path: self.path.segments(),
            walk: &mut walk,
        }
        .deserialize(&mut deserializer);

        match result {
            Ok(()) => Ok(walk.outcome),
            Err(_) if walk.outcome.stopped_early => Ok(walk.outcome),
            Err(e) => Err(self.classify(e)),
        }
    }

    fn classify(&self, err: serde_json::Error) -> SieveError {
        if err.is_io() {
            return self.io_failure(io::Error::from(err));
        }
        SieveError::Decode {
            location: self.location.clone(),
            message: format!("{} at {}", err, self.path),
        }
    }

    fn io_failure(&self, err: io::Error) -> SieveError {
        match err.kind() {
            // flate2 reports corrupt or truncated members this way
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
                SieveError::Decode {
                    location: self.location.clone(),
                    message: err.to_string(),
                }
            }
            _ => SieveError::Transport {
                location: self.location.clone(),
                message: err.to_string(),
            },
        }
    }
}

struct Walk<T, F> {
    visit: F,
    outcome: StreamOutcome,
    _item: PhantomData<fn() -> T>,
}

/// Descends one path segment per nesting level
struct PathSeed<'p, 'w, T, F> {
    path: &'p [String],
    walk: &'w mut Walk<T, F>,
}

impl<'de, T, F> DeserializeSeed<'de> for PathSeed<'_, '_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T) -> ControlFlow<()>,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, T, F> Visitor<'de> for PathSeed<'_, '_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T) -> ControlFlow<()>,
{
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let Some((head, rest)) = self.path.split_first() else {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            return Ok(());
        };

        while let Some(key) = map.next_key::<String>()? {
            if key == *head && !self.walk.outcome.path_found {
                map.next_value_seed(PathSeed {
                    path: rest,
                    walk: &mut *self.walk,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        if !self.path.is_empty() {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            return Ok(());
        }

        self.walk.outcome.path_found = true;
        while let Some(item) = seq.next_element::<T>()? {
            self.walk.outcome.items += 1;
            if (self.walk.visit)(item).is_break() {
                self.walk.outcome.stopped_early = true;
                return Err(de::Error::custom(STOP_SIGNAL));
            }
        }
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }
}
