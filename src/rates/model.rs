use crate::types::{null_as_empty, null_tolerant_ids, text_or_number, Identifier, NegotiatedPrice};
use serde::{Deserialize, Deserializer};

/// Array of provider-reference groups in a rate file
pub const PROVIDER_REFERENCES: &str = "provider_references";

/// Array of negotiated-rate items in a rate file
pub const IN_NETWORK: &str = "in_network";

/// One reference group: an id standing in for a set of providers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderReference {
    #[serde(default)]
    pub provider_group_id: Option<Identifier>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub provider_groups: Vec<ProviderGroup>,
}

impl ProviderReference {
    pub fn npis(&self) -> impl Iterator<Item = &Identifier> {
        self.provider_groups.iter().flat_map(|group| group.npi.iter())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderGroup {
    #[serde(default, deserialize_with = "null_tolerant_ids")]
    pub npi: Vec<Identifier>,
}

/// One billed service and every rate negotiated for it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InNetworkItem {
    /// Kept as published; codes are output, not matched
    #[serde(default, deserialize_with = "text_or_number")]
    pub billing_code: Option<String>,

    #[serde(default)]
    pub billing_code_type: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub negotiated_rates: Vec<RateGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateGroup {
    #[serde(default, deserialize_with = "null_tolerant_ids")]
    pub provider_references: Vec<Identifier>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub negotiated_prices: Vec<PriceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceEntry {
    #[serde(default)]
    pub negotiated_type: Option<String>,

    #[serde(default, deserialize_with = "lenient_rate")]
    pub negotiated_rate: Option<f64>,

    #[serde(default)]
    pub expiration_date: Option<String>,

    #[serde(default)]
    pub billing_class: Option<String>,

    /// Present in files that attach references per price instead of per group
    #[serde(default, deserialize_with = "null_tolerant_ids")]
    pub provider_references: Vec<Identifier>,
}

impl PriceEntry {
    pub fn into_price(self) -> NegotiatedPrice {
        NegotiatedPrice {
            negotiated_type: self.negotiated_type,
            negotiated_rate: self.negotiated_rate,
            expiration_date: self.expiration_date,
            billing_class: self.billing_class,
        }
    }
}

/// Accepts `123.45`, `"123.45"` or `null`
fn lenient_rate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRate {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<RawRate>::deserialize(deserializer)? {
        Some(RawRate::Number(rate)) => Some(rate),
        Some(RawRate::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}
