//! Pluggable matching rules for the index scan
//!
//! A [`PlanMatcher`] decides which index entries are relevant, in two steps:
//! a cheap `may_match` test run on every entry, and a stricter `accept` run
//! only on the survivors. A [`FileFilter`] then decides which of an accepted
//! entry's files are worth keeping.

use crate::config::ScanConfig;
use crate::error::{Result, SieveError};
use crate::index::model::{ReportingPlan, StructureEntry};
use crate::types::{MatchedPlan, TargetIdentifierSet};
use regex::{Regex, RegexBuilder};

pub trait PlanMatcher {
    /// Fast-fail test; `false` skips the entry without looking at its files
    fn may_match(&self, entry: &StructureEntry) -> bool;

    /// Plans on the entry that the policy accepts; empty rejects the entry
    fn accept(&self, entry: &StructureEntry) -> Vec<MatchedPlan>;
}

/// How strictly a plan id must match a target once its prefix matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Full plan id must be a target
    Exact,
    /// Sharing the issuer prefix with a target is enough
    Prefix,
}

/// Matches plan ids against target identifiers
pub struct IdentifierMatcher {
    targets: TargetIdentifierSet,
    acceptance: Acceptance,
}

impl IdentifierMatcher {
    pub fn new(targets: TargetIdentifierSet, acceptance: Acceptance) -> Self {
        IdentifierMatcher { targets, acceptance }
    }
}

impl PlanMatcher for IdentifierMatcher {
    fn may_match(&self, entry: &StructureEntry) -> bool {
        entry
            .reporting_plans
            .iter()
            .filter_map(ReportingPlan::identifier)
            .any(|id| self.targets.contains_prefix_of(&id))
    }

    fn accept(&self, entry: &StructureEntry) -> Vec<MatchedPlan> {
        entry
            .reporting_plans
            .iter()
            .filter(|plan| match (plan.identifier(), self.acceptance) {
                (Some(id), Acceptance::Exact) => self.targets.contains(&id),
                (Some(id), Acceptance::Prefix) => self.targets.contains_prefix_of(&id),
                (None, _) => false,
            })
            .map(ReportingPlan::to_matched)
            .collect()
    }
}

/// Matches keywords against plan and sponsor names
pub struct KeywordMatcher {
    pattern: Regex,
}

impl KeywordMatcher {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let pattern = keyword_pattern(keywords)?.ok_or_else(|| {
            SieveError::InvalidConfig("keyword matcher needs at least one keyword".into())
        })?;
        Ok(KeywordMatcher { pattern })
    }

    fn names_match(&self, plan: &ReportingPlan) -> bool {
        [&plan.plan_name, &plan.plan_sponsor_name]
            .into_iter()
            .flatten()
            .any(|name| self.pattern.is_match(name))
    }
}

impl PlanMatcher for KeywordMatcher {
    fn may_match(&self, entry: &StructureEntry) -> bool {
        entry.reporting_plans.iter().any(|plan| self.names_match(plan))
    }

    fn accept(&self, entry: &StructureEntry) -> Vec<MatchedPlan> {
        entry
            .reporting_plans
            .iter()
            .filter(|plan| self.names_match(plan))
            .map(ReportingPlan::to_matched)
            .collect()
    }
}

/// Content-based filter for candidate rate files
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    exclude: Option<Regex>,
    location_markers: Option<Regex>,
    description_markers: Option<Regex>,
}

impl FileFilter {
    pub fn new(
        exclude_keywords: &[String],
        location_markers: &[String],
        description_markers: &[String],
    ) -> Result<Self> {
        Ok(FileFilter {
            exclude: keyword_pattern(exclude_keywords)?,
            location_markers: keyword_pattern(location_markers)?,
            description_markers: keyword_pattern(description_markers)?,
        })
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Self::new(
            &config.exclude_keywords,
            &config.location_markers,
            &config.description_markers,
        )
    }

    /// Accepts every file
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn is_excluded(&self, description: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(description))
    }

    /// True when some inclusion marker matches, or when no markers are set
    pub fn looks_relevant(&self, location: &str, description: &str) -> bool {
        match (&self.location_markers, &self.description_markers) {
            (None, None) => true,
            (by_location, by_description) => {
                by_location.as_ref().is_some_and(|p| p.is_match(location))
                    || by_description.as_ref().is_some_and(|p| p.is_match(description))
            }
        }
    }

    pub fn admits(&self, location: &str, description: &str) -> bool {
        !self.is_excluded(description) && self.looks_relevant(location, description)
    }
}

/// Case-insensitive alternation of literal keywords; `None` when empty
fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>> {
    let literals: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect();
    if literals.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&literals.join("|"))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| SieveError::InvalidConfig(format!("keyword pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_PREFIX_LEN;

    fn entry(json: serde_json::Value) -> StructureEntry {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_identifier_matcher_prefix_vs_exact() {
        let targets = TargetIdentifierSet::new(["45334GA0010001"], DEFAULT_PREFIX_LEN);
        let sibling = entry(serde_json::json!({
            "reporting_plans": [{"plan_id": "45334GA0020002", "plan_name": "Silver"}]
        }));

        let exact = IdentifierMatcher::new(targets.clone(), Acceptance::Exact);
        assert!(exact.may_match(&sibling));
        assert!(exact.accept(&sibling).is_empty());

        let by_issuer = IdentifierMatcher::new(targets, Acceptance::Prefix);
        let plans = by_issuer.accept(&sibling);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name.as_deref(), Some("Silver"));
    }

    #[test]
    fn test_matching_normalizes_but_reports_published_id() {
        let targets = TargetIdentifierSet::new(["45334GA0010001"], DEFAULT_PREFIX_LEN);
        let lower = entry(serde_json::json!({
            "reporting_plans": [{"plan_id": "45334ga0010001"}, {"plan_id": null}]
        }));

        let plans = IdentifierMatcher::new(targets, Acceptance::Exact).accept(&lower);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "45334ga0010001");
    }

    #[test]
    fn test_keyword_matcher_checks_sponsor() {
        let matcher = KeywordMatcher::new(&["georgia".to_string()]).unwrap();
        let by_sponsor = entry(serde_json::json!({
            "reporting_plans": [
                {"plan_name": "Choice Plus", "plan_sponser_name": "STATE OF GEORGIA"},
                {"plan_name": "Other"}
            ]
        }));
        assert!(matcher.may_match(&by_sponsor));
        assert_eq!(matcher.accept(&by_sponsor).len(), 1);

        assert!(KeywordMatcher::new(&[" ".to_string()]).is_err());
    }

    #[test]
    fn test_file_filter() {
        let filter = FileFilter::from_config(&ScanConfig::default()).unwrap();

        assert!(filter.admits("https://cdn.test/x_in-network-rates.json.gz", "PPO"));
        assert!(filter.admits("https://cdn.test/x.json.gz", "Medical PPO network"));
        assert!(!filter.admits("https://cdn.test/x.json.gz", "PPO network"));
        assert!(!filter.admits("https://cdn.test/x_in-network-rates.json.gz", "DENTAL PPO"));

        // regex metacharacters in keywords are literals
        let literal = FileFilter::new(&["a+b".to_string()], &[], &[]).unwrap();
        assert!(literal.is_excluded("plan a+b"));
        assert!(!literal.is_excluded("plan aab"));
        assert!(FileFilter::permissive().admits("anything", ""));
    }
}
