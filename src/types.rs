use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Length of the HIOS issuer segment at the front of a plan identifier
pub const DEFAULT_PREFIX_LEN: usize = 5;

/// An external identifier in canonical form: trimmed and ASCII-uppercased.
///
/// Source documents carry NPIs, plan ids and reference-group ids either as
/// JSON strings or as JSON integers; both deserialize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Identifier(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The leading `len` characters, used for cheap issuer-level filtering
    pub fn prefix(&self, len: usize) -> PlanPrefix {
        PlanPrefix(self.0.chars().take(len).collect())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Identifier::new(raw)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdentifierVisitor;

        impl Visitor<'_> for IdentifierVisitor {
            type Value = Identifier;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Identifier, E> {
                Ok(Identifier::new(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Identifier, E> {
                Ok(Identifier(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Identifier, E> {
                Ok(Identifier(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Identifier, E> {
                // Some publishers write integral ids as floats (1234567890.0)
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
                    Ok(Identifier((v as i64).to_string()))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_any(IdentifierVisitor)
    }
}

/// Issuer-level prefix of a plan identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanPrefix(String);

impl PlanPrefix {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Immutable set of target identifiers, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct TargetIdentifierSet {
    exact: HashSet<Identifier>,
    prefixes: HashSet<PlanPrefix>,
    prefix_len: usize,
}

impl TargetIdentifierSet {
    pub fn new<I, S>(raw: I, prefix_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_identifiers(raw.into_iter().map(Identifier::new), prefix_len)
    }

    pub fn from_identifiers(ids: impl IntoIterator<Item = Identifier>, prefix_len: usize) -> Self {
        let exact: HashSet<Identifier> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        let prefixes = exact.iter().map(|id| id.prefix(prefix_len)).collect();
        TargetIdentifierSet {
            exact,
            prefixes,
            prefix_len,
        }
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.exact.contains(id)
    }

    /// True when `id` shares its issuer prefix with some target
    pub fn contains_prefix_of(&self, id: &Identifier) -> bool {
        self.prefixes.contains(&id.prefix(self.prefix_len))
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// A plan on a matched index entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPlan {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
}

/// A rate file located by the index scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    #[serde(default)]
    pub plans: Vec<MatchedPlan>,
}

/// One negotiated price on a matched service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiatedPrice {
    pub negotiated_type: Option<String>,
    pub negotiated_rate: Option<f64>,
    pub expiration_date: Option<String>,
    pub billing_class: Option<String>,
}

/// A service from a rate file with every price negotiated for target providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub billing_code: Option<String>,
    pub billing_code_type: Option<String>,
    pub description: Option<String>,
    pub rates: Vec<NegotiatedPrice>,
    pub source_file: String,
    /// Full location the record came from; key for idempotent overwrite
    pub source_location: String,
}

/// Derived summary written next to the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMetadata {
    pub last_updated: DateTime<Utc>,
    pub total_files_in_index: usize,
    pub files_processed: usize,
    pub total_rates_found: usize,
}

/// Treat an explicit JSON `null` list the same as an absent one
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifier list that tolerates `null` for the list and for its elements
pub(crate) fn null_tolerant_ids<'de, D>(deserializer: D) -> Result<Vec<Identifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<Identifier>>>::deserialize(deserializer)?;
    Ok(raw.into_iter().flatten().flatten().collect())
}

/// A code or id kept exactly as published, whether written as a string or a number
pub(crate) fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawText {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(match Option::<RawText>::deserialize(deserializer)? {
        Some(RawText::Text(text)) => Some(text),
        Some(RawText::Unsigned(n)) => Some(n.to_string()),
        Some(RawText::Signed(n)) => Some(n.to_string()),
        Some(RawText::Float(n)) => Some(n.to_string()),
        None => None,
    })
}

/// File name portion of a location, without query string or fragment
pub fn file_name_of(location: &str) -> String {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = location[..end].trim_end_matches('/');
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}
