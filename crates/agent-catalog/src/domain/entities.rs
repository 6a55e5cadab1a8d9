//! # Domain Entities
//!
//! Records published by agents, the persisted catalog row, and the
//! structured lookup filters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::errors::{QueryError, RejectReason};
use super::value_objects::{Outpoint, Topic};

/// Unix timestamp in seconds since epoch.
pub type Timestamp = u64;

/// One decoded transaction output, as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub output_index: u32,
    pub script: Vec<u8>,
}

impl RawOutput {
    pub fn new(output_index: u32, script: impl Into<Vec<u8>>) -> Self {
        Self {
            output_index,
            script: script.into(),
        }
    }
}

/// An agent's published identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Hex-encoded 33-byte compressed public key.
    pub identity_key: String,
    pub name: String,
    pub description: String,
    /// Channel name → handle. Keys are unique by construction.
    pub channels: BTreeMap<String, String>,
    /// Ordered as published.
    pub capabilities: Vec<String>,
    /// ISO-8601 publication time, as supplied by the publisher.
    pub timestamp: String,
}

/// Price attached to a service offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub model: String,
    pub amount_sats: u64,
}

/// A service offered by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub identity_key: String,
    pub service_id: String,
    pub name: String,
    pub description: String,
    pub pricing: Pricing,
    pub timestamp: String,
}

/// A validated payload. Closed set of categories, one per [`Topic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPayload {
    Identity(IdentityRecord),
    Service(ServiceRecord),
}

impl AgentPayload {
    pub fn topic(&self) -> Topic {
        match self {
            AgentPayload::Identity(_) => Topic::Identity,
            AgentPayload::Service(_) => Topic::Service,
        }
    }

    pub fn identity_key(&self) -> &str {
        match self {
            AgentPayload::Identity(r) => &r.identity_key,
            AgentPayload::Service(r) => &r.identity_key,
        }
    }

    /// JSON object as it appears on the wire: record fields plus the
    /// `protocol` and `type` discriminators.
    pub fn to_wire_value(&self, protocol_id: &str) -> Value {
        let type_tag = self.topic().type_tag();
        match self {
            AgentPayload::Identity(r) => json!({
                "protocol": protocol_id,
                "type": type_tag,
                "identityKey": r.identity_key,
                "name": r.name,
                "description": r.description,
                "channels": r.channels,
                "capabilities": r.capabilities,
                "timestamp": r.timestamp,
            }),
            AgentPayload::Service(r) => json!({
                "protocol": protocol_id,
                "type": type_tag,
                "identityKey": r.identity_key,
                "serviceId": r.service_id,
                "name": r.name,
                "description": r.description,
                "pricing": {
                    "model": r.pricing.model,
                    "amountSats": r.pricing.amount_sats,
                },
                "timestamp": r.timestamp,
            }),
        }
    }
}

/// A persisted catalog row.
///
/// Primary key is `outpoint`; it never changes once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub outpoint: Outpoint,
    pub payload: AgentPayload,
    /// When this catalog wrote the row.
    pub indexed_at: Timestamp,
}

impl CatalogEntry {
    /// Capability list in the JSON form capability filters match against.
    pub fn serialized_capabilities(&self) -> Option<String> {
        match &self.payload {
            AgentPayload::Identity(r) => serde_json::to_string(&r.capabilities).ok(),
            AgentPayload::Service(_) => None,
        }
    }
}

/// Result of a topic manager's per-transaction decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmittanceInstructions {
    /// Output indices admitted into the topic, ascending.
    pub outputs_to_admit: Vec<u32>,
    /// Previously admitted coins to keep. Always empty for this catalog.
    pub coins_to_retain: Vec<u32>,
}

/// What `on_admitted` did with an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Row written.
    Indexed {
        /// A row already existed at this outpoint and was overwritten.
        replaced: bool,
        /// Other rows removed by the service uniqueness rule.
        superseded: Vec<Outpoint>,
    },
    /// Payload failed the re-check; nothing was written.
    Rejected(RejectReason),
}

impl AdmitOutcome {
    pub fn is_indexed(&self) -> bool {
        matches!(self, AdmitOutcome::Indexed { .. })
    }
}

/// Filter over identity rows. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentQuery {
    /// Exact match.
    pub identity_key: Option<String>,
    /// Case-insensitive substring.
    pub name: Option<String>,
    /// Substring of the serialized capability list.
    pub capability: Option<String>,
}

impl AgentQuery {
    pub fn by_identity_key(key: impl Into<String>) -> Self {
        Self {
            identity_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn by_capability(capability: impl Into<String>) -> Self {
        Self {
            capability: Some(capability.into()),
            ..Default::default()
        }
    }
}

/// Filter over service rows. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceQuery {
    /// Exact match on `serviceId`.
    pub service_type: Option<String>,
    /// Inclusive upper bound on `pricing.amountSats`.
    pub max_price_sats: Option<u64>,
    /// Exact match on `identityKey`.
    pub provider: Option<String>,
}

impl ServiceQuery {
    pub fn by_service_type(service_type: impl Into<String>) -> Self {
        Self {
            service_type: Some(service_type.into()),
            ..Default::default()
        }
    }

    pub fn by_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Default::default()
        }
    }

    pub fn with_max_price(mut self, max_price_sats: u64) -> Self {
        self.max_price_sats = Some(max_price_sats);
        self
    }
}

/// A structured lookup against one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupQuery {
    Agent(AgentQuery),
    Service(ServiceQuery),
}

impl LookupQuery {
    pub fn topic(&self) -> Topic {
        match self {
            LookupQuery::Agent(_) => Topic::Identity,
            LookupQuery::Service(_) => Topic::Service,
        }
    }
}

impl From<AgentQuery> for LookupQuery {
    fn from(query: AgentQuery) -> Self {
        LookupQuery::Agent(query)
    }
}

impl From<ServiceQuery> for LookupQuery {
    fn from(query: ServiceQuery) -> Self {
        LookupQuery::Service(query)
    }
}

/// A lookup as the host delivers it: a lookup service name plus a JSON
/// filter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuestion {
    pub service: String,
    #[serde(default)]
    pub query: Value,
}

impl LookupQuestion {
    pub fn new(service: impl Into<String>, query: Value) -> Self {
        Self {
            service: service.into(),
            query,
        }
    }

    /// Resolve the service name and parse the filter for that category.
    ///
    /// A `null` query is the empty filter.
    pub fn parse(&self) -> Result<LookupQuery, QueryError> {
        let topic = Topic::from_lookup_service_name(&self.service)
            .ok_or_else(|| QueryError::UnknownService(self.service.clone()))?;
        let query = match &self.query {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        let invalid = |err: serde_json::Error| QueryError::InvalidQuery {
            service: self.service.clone(),
            message: err.to_string(),
        };
        Ok(match topic {
            Topic::Identity => LookupQuery::Agent(serde_json::from_value(query).map_err(invalid)?),
            Topic::Service => LookupQuery::Service(serde_json::from_value(query).map_err(invalid)?),
        })
    }
}

/// Descriptor the host shows for a topic manager or lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    pub short_description: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Txid;

    fn identity() -> IdentityRecord {
        IdentityRecord {
            identity_key: "02".to_string() + &"ab".repeat(32),
            name: "Relay".to_string(),
            description: "relays things".to_string(),
            channels: BTreeMap::from([("email".to_string(), "relay@example.com".to_string())]),
            capabilities: vec!["translate".to_string(), "summarize".to_string()],
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_wire_value_carries_discriminators() {
        let payload = AgentPayload::Identity(identity());
        let value = payload.to_wire_value("agent-catalog");

        assert_eq!(value["protocol"], "agent-catalog");
        assert_eq!(value["type"], "identity");
        assert_eq!(value["identityKey"], payload.identity_key());
        assert_eq!(value["capabilities"][1], "summarize");
    }

    #[test]
    fn test_wire_value_carries_every_record_field() {
        let record = identity();
        let value = AgentPayload::Identity(record.clone()).to_wire_value("agent-catalog");

        let mut fields: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec![
                "capabilities",
                "channels",
                "description",
                "identityKey",
                "name",
                "protocol",
                "timestamp",
                "type"
            ]
        );
        assert_eq!(value["channels"]["email"], "relay@example.com");
        assert_eq!(value["description"], "relays things");

        // The record half reads back as the same record.
        let decoded: IdentityRecord = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_service_wire_value_nests_pricing() {
        let payload = AgentPayload::Service(ServiceRecord {
            identity_key: "03".to_string() + &"cd".repeat(32),
            service_id: "translate".to_string(),
            name: "Translator".to_string(),
            description: String::new(),
            pricing: Pricing {
                model: "per-call".to_string(),
                amount_sats: 250,
            },
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        });
        let value = payload.to_wire_value("agent-catalog");

        assert_eq!(value["type"], "service");
        assert_eq!(value["serviceId"], "translate");
        assert_eq!(value["pricing"]["amountSats"], 250);
    }

    #[test]
    fn test_entry_bincode_round_trip() {
        let entry = CatalogEntry {
            outpoint: Outpoint::new(Txid([7; 32]), 3),
            payload: AgentPayload::Identity(identity()),
            indexed_at: 1_700_000_000,
        };
        let bytes = bincode::serialize(&entry).unwrap();
        let decoded: CatalogEntry = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_lookup_question_parses_per_service() {
        let question = LookupQuestion::new(
            "ls_agent_service",
            serde_json::json!({ "serviceType": "translate", "maxPriceSats": 500 }),
        );
        assert_eq!(
            question.parse().unwrap(),
            LookupQuery::Service(ServiceQuery::by_service_type("translate").with_max_price(500))
        );

        let empty = LookupQuestion::new("ls_agent_identity", Value::Null);
        assert_eq!(empty.parse().unwrap(), LookupQuery::Agent(AgentQuery::default()));
    }

    #[test]
    fn test_lookup_question_errors() {
        let unknown = LookupQuestion::new("ls_weather", Value::Null);
        assert_eq!(
            unknown.parse().unwrap_err(),
            QueryError::UnknownService("ls_weather".to_string())
        );

        let negative = LookupQuestion::new(
            "ls_agent_service",
            serde_json::json!({ "maxPriceSats": -1 }),
        );
        assert!(matches!(
            negative.parse().unwrap_err(),
            QueryError::InvalidQuery { .. }
        ));
    }

    #[test]
    fn test_agent_query_rejects_unknown_fields() {
        let parsed: Result<AgentQuery, _> =
            serde_json::from_value(serde_json::json!({ "identityKey": "x", "color": "red" }));
        assert!(parsed.is_err());
    }
}
