//! Target registries: who we are looking for
//!
//! A registry maps a display name (hospital, carrier) to the identifiers that
//! stand for it in price-transparency files. Registries are produced by
//! separate fetchers; this module only reads their JSON output.

use crate::error::{Result, SieveError};
use crate::persist;
use crate::types::{Identifier, TargetIdentifierSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

static NPI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

#[derive(Debug, Deserialize)]
struct HospitalRow {
    npi: Identifier,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssuerRow {
    issuer_id: Identifier,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    groups: BTreeMap<String, BTreeSet<Identifier>>,
    rejected: Vec<String>,
}

impl Registry {
    /// Hospital registry: `[{"npi": ..., "name": ...}, ...]`.
    ///
    /// Rows whose NPI is not ten digits are set aside in [`Registry::rejected`].
    pub fn load_hospitals(path: &Path) -> Result<Self> {
        let rows: Vec<HospitalRow> = read_required(path)?;
        let mut registry = Registry::default();
        for row in rows {
            if NPI_PATTERN.is_match(row.npi.as_str()) {
                let name = row.name.unwrap_or_else(|| row.npi.to_string());
                registry.insert(name, row.npi);
            } else {
                registry.rejected.push(row.npi.to_string());
            }
        }
        Ok(registry)
    }

    /// Issuer registry: `[{"issuer_id": ..., "name": ...}, ...]`
    pub fn load_issuers(path: &Path) -> Result<Self> {
        let rows: Vec<IssuerRow> = read_required(path)?;
        let mut registry = Registry::default();
        for row in rows.into_iter().filter(|row| !row.issuer_id.is_empty()) {
            let name = row.name.unwrap_or_else(|| row.issuer_id.to_string());
            registry.insert(name, row.issuer_id);
        }
        Ok(registry)
    }

    /// A single group built from raw identifiers (e.g. command-line values)
    pub fn from_identifiers<S: AsRef<str>>(name: &str, raw: &[S]) -> Self {
        let mut registry = Registry::default();
        for id in raw.iter().map(Identifier::new).filter(|id| !id.is_empty()) {
            registry.insert(name.to_string(), id);
        }
        registry
    }

    pub fn insert(&mut self, name: String, id: Identifier) {
        self.groups.entry(name).or_default().insert(id);
    }

    pub fn merge(&mut self, other: Registry) {
        for (name, ids) in other.groups {
            self.groups.entry(name).or_default().extend(ids);
        }
        self.rejected.extend(other.rejected);
    }

    pub fn groups(&self) -> &BTreeMap<String, BTreeSet<Identifier>> {
        &self.groups
    }

    /// Raw values dropped for not looking like a valid identifier
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(BTreeSet::is_empty)
    }

    /// Flatten every group into one membership set
    pub fn targets(&self, prefix_len: usize) -> TargetIdentifierSet {
        TargetIdentifierSet::from_identifiers(self.groups.values().flatten().cloned(), prefix_len)
    }
}

fn read_required<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    persist::read_json(path)?.ok_or_else(|| SieveError::MissingInput {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_PREFIX_LEN;

    #[test]
    fn test_load_hospitals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospitals.json");
        std::fs::write(
            &path,
            r#"[
                {"npi": "1992799050", "name": "GRADY MEMORIAL HOSPITAL", "city": "Atlanta"},
                {"npi": 1922178789, "name": "CHOA EGLESTON"},
                {"npi": "1922178789", "name": "CHOA EGLESTON"},
                {"npi": "12345", "name": "TYPO"}
            ]"#,
        )
        .unwrap();

        let registry = Registry::load_hospitals(&path).unwrap();

        assert_eq!(registry.groups().len(), 2);
        assert_eq!(registry.rejected(), &["12345".to_string()]);
        let targets = registry.targets(DEFAULT_PREFIX_LEN);
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&Identifier::new("1922178789")));
    }

    #[test]
    fn test_load_issuers_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuers.json");
        std::fs::write(
            &path,
            r#"[{"issuer_id": "45334", "name": "Anthem"}, {"issuer_id": "49046", "name": "Anthem"}]"#,
        )
        .unwrap();

        let mut registry = Registry::load_issuers(&path).unwrap();
        registry.merge(Registry::from_identifiers("cli", &["58081ga0010001"]));

        assert_eq!(registry.groups()["Anthem"].len(), 2);
        let targets = registry.targets(DEFAULT_PREFIX_LEN);
        assert!(targets.contains(&Identifier::new("58081GA0010001")));
        assert!(targets.contains_prefix_of(&Identifier::new("49046GA0990001")));
    }

    #[test]
    fn test_targets_use_requested_prefix_length() {
        let registry = Registry::from_identifiers("cli", &["45334GA0010001"]);
        let targets = registry.targets(3);
        assert_eq!(targets.prefix_len(), 3);
        assert!(targets.contains_prefix_of(&Identifier::new("45399TX0000001")));
        assert!(!registry.targets(DEFAULT_PREFIX_LEN).contains_prefix_of(&Identifier::new("45399TX0000001")));
    }

    #[test]
    fn test_missing_registry_is_fatal_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Registry::load_hospitals(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SieveError::MissingInput { .. })));
        assert!(Registry::default().is_empty());
    }
}
