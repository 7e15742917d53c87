//! HTTP client for the content-management backend.
//!
//! The backend serializes list fields as either JSON arrays or
//! string-encoded arrays depending on its age; both are accepted here, and
//! unparseable fields decode to empty collections so one bad record never
//! takes down resolution.

use async_trait::async_trait;
use ramp_core::{
    ContentItem, ContentKind, ContentSource, ContentVariant, Difficulty, RampError, RawCatalog,
    Tier,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// One content record as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
    pub id: String,
    pub title: String,
    pub kind: ContentKind,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub tags: Value,
    #[serde(default)]
    pub prerequisites: Value,
    #[serde(default, rename = "tierAffinity")]
    pub tier_affinity: Value,
}

/// One variant record as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireVariant {
    #[serde(rename = "baseItemId")]
    pub base_item_id: String,
    pub tier: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default, rename = "changeSet")]
    pub change_set: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub prerequisites: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireCatalog {
    #[serde(default)]
    items: Vec<WireRecord>,
    #[serde(default)]
    variants: Vec<WireVariant>,
}

/// Decode a list field that may be a JSON array of strings or a
/// string-encoded JSON array. Anything else becomes an empty list.
pub fn decode_list(field: &str, value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Value::String(encoded) => match serde_json::from_str::<Vec<String>>(encoded) {
            Ok(list) => list,
            Err(_) => {
                warn!(
                    "substituting empty list: {}",
                    RampError::MalformedRecord(field.to_string())
                );
                Vec::new()
            }
        },
        _ => {
            warn!(
                "substituting empty list: {}",
                RampError::MalformedRecord(field.to_string())
            );
            Vec::new()
        }
    }
}

fn decode_tiers(field: &str, value: &Value) -> Vec<Tier> {
    decode_list(field, value)
        .iter()
        .filter_map(|s| match s.parse::<Tier>() {
            Ok(tier) => Some(tier),
            Err(_) => {
                warn!("unknown tier {:?} in {} field dropped", s, field);
                None
            }
        })
        .collect()
}

impl WireRecord {
    pub fn into_item(self) -> ContentItem {
        let mut item = ContentItem::new(&self.id, &self.title, self.kind);
        item.category = self.category;
        item.mandatory = self.mandatory;
        item.rank = self.order;
        item.difficulty = self.difficulty.unwrap_or_default();
        item.tags = decode_list("tags", &self.tags);
        item.prerequisites = decode_list("prerequisites", &self.prerequisites);
        item.tier_affinity = decode_tiers("tierAffinity", &self.tier_affinity);
        item
    }
}

impl WireVariant {
    /// `None` when the tier name is unknown; the variant is then dropped.
    pub fn into_variant(self) -> Option<ContentVariant> {
        let tier = match self.tier.parse::<Tier>() {
            Ok(tier) => tier,
            Err(_) => {
                warn!(
                    "variant for {} names unknown tier {:?}, dropped",
                    self.base_item_id, self.tier
                );
                return None;
            }
        };
        Some(ContentVariant {
            base_item_id: self.base_item_id,
            tier,
            team: self.team,
            change_set: decode_list("changeSet", &self.change_set),
            title: self.title,
            category: self.category,
            mandatory: self.mandatory,
            rank: self.order,
            difficulty: self.difficulty,
            tags: self.tags.map(|v| decode_list("tags", &v)),
            prerequisites: self.prerequisites.map(|v| decode_list("prerequisites", &v)),
        })
    }
}

/// Content source backed by the HTTP content backend.
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch(&self, team: &str) -> Result<RawCatalog, RampError> {
        let url = format!("{}/content", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("team", team)])
            .send()
            .await
            .map_err(|e| RampError::Backend(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RampError::Backend(format!(
                "content backend returned {}",
                response.status()
            )));
        }
        let wire: WireCatalog = response
            .json()
            .await
            .map_err(|e| RampError::Backend(e.to_string()))?;

        Ok(RawCatalog {
            items: wire.items.into_iter().map(WireRecord::into_item).collect(),
            variants: wire
                .variants
                .into_iter()
                .filter_map(WireVariant::into_variant)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_list_accepts_array() {
        let v = json!(["a", "b"]);
        assert_eq!(decode_list("tags", &v), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_list_accepts_string_encoded_array() {
        let v = json!("[\"a\",\"b\"]");
        assert_eq!(decode_list("tags", &v), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_list_malformed_becomes_empty() {
        assert!(decode_list("tags", &json!("not json")).is_empty());
        assert!(decode_list("tags", &json!(42)).is_empty());
        assert!(decode_list("tags", &json!(null)).is_empty());
    }

    #[test]
    fn test_wire_record_conversion() {
        let record: WireRecord = serde_json::from_value(json!({
            "id": "m1",
            "title": "Intro",
            "kind": "module",
            "mandatory": true,
            "order": 2,
            "difficulty": "intermediate",
            "prerequisites": "[\"m0\"]",
            "tierAffinity": ["ROOKIE", "HIGH_FLYER"]
        }))
        .unwrap();
        let item = record.into_item();
        assert!(item.mandatory);
        assert_eq!(item.rank, Some(2));
        assert_eq!(item.prerequisites, vec!["m0"]);
        assert_eq!(item.tier_affinity, vec![Tier::Rookie, Tier::HighFlyer]);
    }

    #[test]
    fn test_wire_variant_unknown_tier_dropped() {
        let variant: WireVariant = serde_json::from_value(json!({
            "baseItemId": "m1",
            "tier": "LEGEND",
            "changeSet": ["title"],
            "title": "New"
        }))
        .unwrap();
        assert!(variant.into_variant().is_none());
    }

    #[test]
    fn test_wire_variant_conversion() {
        let variant: WireVariant = serde_json::from_value(json!({
            "baseItemId": "m1",
            "tier": "AT_RISK",
            "changeSet": "[\"title\",\"order\"]",
            "title": "Refresher intro",
            "order": 1
        }))
        .unwrap();
        let variant = variant.into_variant().unwrap();
        assert_eq!(variant.tier, Tier::AtRisk);
        assert_eq!(variant.change_set, vec!["title", "order"]);
        assert_eq!(variant.rank, Some(1));
    }
}
