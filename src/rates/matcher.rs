use crate::error::Result;
use crate::progress::{Cadence, NoProgress, ProgressEvent, ProgressSink};
use crate::rates::model::ProviderReference;
use crate::stream::JsonStream;
use crate::types::{Identifier, TargetIdentifierSet};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Reference-group ids of one rate file that point at a target provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMembership {
    groups: HashSet<Identifier>,
}

impl ReferenceMembership {
    pub fn insert(&mut self, group: Identifier) -> bool {
        self.groups.insert(group)
    }

    pub fn contains(&self, group: &Identifier) -> bool {
        self.groups.contains(group)
    }

    pub fn intersects(&self, groups: &[Identifier]) -> bool {
        groups.iter().any(|group| self.groups.contains(group))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<Identifier> for ReferenceMembership {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        ReferenceMembership {
            groups: iter.into_iter().collect(),
        }
    }
}

/// Pass 1: find the reference groups that contain a target NPI.
///
/// Reads the whole `provider_references` array; a group can appear anywhere.
pub struct ReferenceMatcher<'a> {
    targets: &'a TargetIdentifierSet,
    cadence: Cadence,
    progress: &'a dyn ProgressSink,
}

impl<'a> ReferenceMatcher<'a> {
    pub fn new(targets: &'a TargetIdentifierSet, progress_every: u64) -> Self {
        ReferenceMatcher {
            targets,
            cadence: Cadence::new(progress_every),
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(&self, stream: &JsonStream<'_>) -> Result<ReferenceMembership> {
        let mut membership = ReferenceMembership::default();
        let mut scanned = 0u64;

        stream.for_each(|reference: ProviderReference| {
            scanned += 1;
            if let Some(group) = &reference.provider_group_id {
                if reference.npis().any(|npi| self.targets.contains(npi)) {
                    membership.insert(group.clone());
                }
            }

            if self.cadence.due(scanned) {
                self.progress.on_progress(&ProgressEvent::References {
                    location: stream.location().to_string(),
                    scanned,
                    matched: membership.len(),
                });
            }
            ControlFlow::Continue(())
        })?;

        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::model::PROVIDER_REFERENCES;
    use crate::stream::JsonPath;
    use crate::testing::MemorySource;

    #[test]
    fn test_collects_groups_with_target_npis() {
        let doc = r#"{
            "provider_references": [
                {"provider_group_id": 1, "provider_groups": [{"npi": [1992799050]}]},
                {"provider_group_id": 2, "provider_groups": [{"npi": [1000000000]}, {"npi": [1922178789]}]},
                {"provider_group_id": 3, "provider_groups": [{"npi": [1000000001]}]},
                {"provider_groups": [{"npi": [1992799050]}]}
            ],
            "in_network": []
        }"#;
        let source = MemorySource::new().with_gzip("rates", doc);
        let stream = JsonStream::new(&source, "rates", JsonPath::parse(PROVIDER_REFERENCES));
        let targets = TargetIdentifierSet::new(["1992799050", "1922178789"], 5);

        let membership = ReferenceMatcher::new(&targets, 0).build(&stream).unwrap();

        assert_eq!(membership.len(), 2);
        assert!(membership.contains(&Identifier::new("1")));
        assert!(membership.contains(&Identifier::new("2")));
        assert!(!membership.contains(&Identifier::new("3")));
    }

    #[test]
    fn test_no_references_is_empty_membership() {
        let source = MemorySource::new().with_gzip("rates", r#"{"in_network": []}"#);
        let stream = JsonStream::new(&source, "rates", JsonPath::parse(PROVIDER_REFERENCES));
        let targets = TargetIdentifierSet::new(["1992799050"], 5);

        let membership = ReferenceMatcher::new(&targets, 0).build(&stream).unwrap();
        assert!(membership.is_empty());
    }
}
