use crate::types::{null_as_empty, text_or_number, Identifier, MatchedPlan};
use serde::Deserialize;

/// One element of an index document's `reporting_structure` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reporting_plans: Vec<ReportingPlan>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub in_network_files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportingPlan {
    /// As published; see [`ReportingPlan::identifier`] for the matching form
    #[serde(default, deserialize_with = "text_or_number")]
    pub plan_id: Option<String>,

    #[serde(default)]
    pub plan_name: Option<String>,

    #[serde(default)]
    pub plan_id_type: Option<String>,

    /// Some publishers spell the key `plan_sponser_name`
    #[serde(default, alias = "plan_sponser_name")]
    pub plan_sponsor_name: Option<String>,
}

impl ReportingPlan {
    pub fn identifier(&self) -> Option<Identifier> {
        self.plan_id
            .as_deref()
            .map(Identifier::new)
            .filter(|id| !id.is_empty())
    }

    pub fn to_matched(&self) -> MatchedPlan {
        MatchedPlan {
            id: self.plan_id.clone().unwrap_or_default(),
            name: self.plan_name.clone(),
            plan_type: self.plan_id_type.clone(),
        }
    }
}

/// Pointer to a rate file inside an index entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDescriptor {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_tolerates_sparse_fields() {
        let entry: StructureEntry = serde_json::from_str(
            r#"{
                "reporting_plans": [
                    {"plan_id": 45334, "plan_name": "Gold PPO", "plan_id_type": "HIOS",
                     "plan_sponser_name": "ACME", "plan_market_type": "individual"}
                ],
                "in_network_files": null,
                "allowed_amount_file": {"location": "https://cdn.test/allowed.json"}
            }"#,
        )
        .unwrap();

        assert!(entry.in_network_files.is_empty());
        let plan = &entry.reporting_plans[0];
        assert_eq!(plan.plan_sponsor_name.as_deref(), Some("ACME"));
        assert_eq!(plan.to_matched().id, "45334");
        assert_eq!(plan.to_matched().plan_type.as_deref(), Some("HIOS"));
    }

    #[test]
    fn test_plan_id_kept_as_published() {
        let plan: ReportingPlan =
            serde_json::from_str(r#"{"plan_id": "45334ga0010001 "}"#).unwrap();
        assert_eq!(plan.to_matched().id, "45334ga0010001 ");
        assert_eq!(plan.identifier(), Some(Identifier::new("45334GA0010001")));

        let blank: ReportingPlan = serde_json::from_str(r#"{"plan_id": "  "}"#).unwrap();
        assert_eq!(blank.identifier(), None);
    }
}
