use crate::error::Result;
use crate::progress::{Cadence, NoProgress, ProgressEvent, ProgressSink};
use crate::rates::matcher::ReferenceMembership;
use crate::rates::model::{InNetworkItem, PriceEntry};
use crate::stream::JsonStream;
use crate::types::{file_name_of, NegotiatedPrice, RateRecord};
use std::ops::ControlFlow;

/// Counts from one pass-2 scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub items_scanned: u64,
    pub records: u64,
}

/// Pass 2: keep the in-network items priced for a member reference group
pub struct RateJoiner<'a> {
    membership: &'a ReferenceMembership,
    cadence: Cadence,
    progress: &'a dyn ProgressSink,
}

impl<'a> RateJoiner<'a> {
    pub fn new(membership: &'a ReferenceMembership, progress_every: u64) -> Self {
        RateJoiner {
            membership,
            cadence: Cadence::new(progress_every),
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Hand every qualifying record to `emit` as soon as it is built
    pub fn join<F>(&self, stream: &JsonStream<'_>, mut emit: F) -> Result<JoinSummary>
    where
        F: FnMut(RateRecord),
    {
        let location = stream.location();
        let source_file = file_name_of(location);
        let mut summary = JoinSummary::default();

        stream.for_each(|item: InNetworkItem| {
            summary.items_scanned += 1;
            if let Some(record) = self.record_for(item, &source_file, location) {
                summary.records += 1;
                emit(record);
            }

            if self.cadence.due(summary.items_scanned) {
                self.progress.on_progress(&ProgressEvent::Rates {
                    location: location.to_string(),
                    scanned: summary.items_scanned,
                    emitted: summary.records,
                });
            }
            ControlFlow::Continue(())
        })?;

        Ok(summary)
    }

    fn record_for(&self, item: InNetworkItem, source_file: &str, location: &str) -> Option<RateRecord> {
        let mut rates: Vec<NegotiatedPrice> = Vec::new();

        for group in item.negotiated_rates {
            if self.membership.intersects(&group.provider_references) {
                rates.extend(group.negotiated_prices.into_iter().map(PriceEntry::into_price));
            } else {
                rates.extend(
                    group
                        .negotiated_prices
                        .into_iter()
                        .filter(|price| self.membership.intersects(&price.provider_references))
                        .map(PriceEntry::into_price),
                );
            }
        }

        if rates.is_empty() {
            return None;
        }
        Some(RateRecord {
            billing_code: item.billing_code,
            billing_code_type: item.billing_code_type,
            description: item.name,
            rates,
            source_file: source_file.to_string(),
            source_location: location.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::model::IN_NETWORK;
    use crate::stream::JsonPath;
    use crate::testing::MemorySource;
    use crate::types::Identifier;

    fn run(doc: &str, membership: &ReferenceMembership) -> (Vec<RateRecord>, JoinSummary) {
        let source = MemorySource::new().with_gzip("https://cdn.test/plan_rates.json.gz?sig=1", doc);
        let stream = JsonStream::new(
            &source,
            "https://cdn.test/plan_rates.json.gz?sig=1",
            JsonPath::parse(IN_NETWORK),
        );
        let mut records = Vec::new();
        let summary = RateJoiner::new(membership, 0)
            .join(&stream, |record| records.push(record))
            .unwrap();
        (records, summary)
    }

    #[test]
    fn test_group_level_references() {
        let doc = r#"{"in_network": [
            {"billing_code": "70450", "billing_code_type": "CPT", "name": "CT HEAD",
             "negotiated_rates": [{"provider_references": ["A"], "negotiated_prices": [
                {"negotiated_type": "negotiated", "negotiated_rate": 310.0, "billing_class": "institutional"},
                {"negotiated_type": "negotiated", "negotiated_rate": 95.0, "billing_class": "professional"}
             ]}]},
            {"billing_code": "70460", "billing_code_type": "CPT", "name": "CT HEAD W DYE",
             "negotiated_rates": [{"provider_references": ["B"], "negotiated_prices": [
                {"negotiated_type": "negotiated", "negotiated_rate": 400.0}
             ]}]},
            {"billing_code": "70470", "billing_code_type": "CPT", "name": "CT HEAD W/O & W DYE",
             "negotiated_rates": [{"provider_references": ["A", "B"], "negotiated_prices": [
                {"negotiated_type": "fee schedule", "negotiated_rate": 450.0},
                {"negotiated_type": "negotiated", "negotiated_rate": 120.0}
             ]}]}
        ]}"#;
        let membership: ReferenceMembership = [Identifier::new("a")].into_iter().collect();

        let (records, summary) = run(doc, &membership);

        assert_eq!(summary, JoinSummary { items_scanned: 3, records: 2 });
        let codes: Vec<_> = records.iter().map(|r| r.billing_code.as_deref().unwrap()).collect();
        assert_eq!(codes, vec!["70450", "70470"]);
        assert_eq!(records[0].rates.len(), 2);
        assert_eq!(records[1].rates.len(), 2);
        assert_eq!(records[0].description.as_deref(), Some("CT HEAD"));
        assert_eq!(records[0].source_file, "plan_rates.json.gz");
        assert_eq!(records[0].source_location, "https://cdn.test/plan_rates.json.gz?sig=1");
    }

    #[test]
    fn test_price_level_references_and_mixed_groups() {
        let doc = r#"{"in_network": [
            {"billing_code": 99213, "billing_code_type": "CPT", "name": "OFFICE VISIT",
             "negotiated_rates": [
                {"negotiated_prices": [
                    {"negotiated_rate": 80.0, "provider_references": [17]},
                    {"negotiated_rate": 70.0, "provider_references": [18]}
                ]},
                {"provider_references": [17], "negotiated_prices": [{"negotiated_rate": "82.5"}]},
                {"provider_references": [19], "negotiated_prices": [{"negotiated_rate": 60.0}]}
             ]},
            {"billing_code": "99214", "negotiated_rates": null}
        ]}"#;
        let membership: ReferenceMembership = [Identifier::new("17")].into_iter().collect();

        let (records, _) = run(doc, &membership);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].billing_code.as_deref(), Some("99213"));
        let rates: Vec<_> = records[0].rates.iter().map(|r| r.negotiated_rate).collect();
        assert_eq!(rates, vec![Some(80.0), Some(82.5)]);
    }
}
