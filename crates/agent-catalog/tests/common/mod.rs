//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;

use agent_catalog::{
    encode, AgentPayload, IdentityRecord, Pricing, ServiceRecord, Txid, PROTOCOL_ID,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn identity_key(seed: u8) -> String {
    format!("02{}", hex::encode([seed; 32]))
}

pub fn txid(seed: u8) -> Txid {
    Txid([seed; 32])
}

pub fn identity(seed: u8, name: &str, capabilities: &[&str]) -> IdentityRecord {
    IdentityRecord {
        identity_key: identity_key(seed),
        name: name.to_string(),
        description: format!("{} agent", name),
        channels: BTreeMap::from([("http".to_string(), format!("https://{}.example", seed))]),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        timestamp: "2026-06-01T12:00:00Z".to_string(),
    }
}

pub fn service(seed: u8, service_id: &str, amount_sats: u64) -> ServiceRecord {
    ServiceRecord {
        identity_key: identity_key(seed),
        service_id: service_id.to_string(),
        name: format!("{} service", service_id),
        description: String::new(),
        pricing: Pricing {
            model: "per-call".to_string(),
            amount_sats,
        },
        timestamp: "2026-06-01T12:00:00Z".to_string(),
    }
}

pub fn identity_script(seed: u8, name: &str, capabilities: &[&str]) -> Vec<u8> {
    encode(
        &AgentPayload::Identity(identity(seed, name, capabilities)),
        PROTOCOL_ID,
    )
}

pub fn service_script(seed: u8, service_id: &str, amount_sats: u64) -> Vec<u8> {
    encode(
        &AgentPayload::Service(service(seed, service_id, amount_sats)),
        PROTOCOL_ID,
    )
}
