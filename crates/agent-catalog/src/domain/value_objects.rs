//! # Value Objects
//!
//! Immutable value objects shared by every layer of the catalog:
//! wire constants, output identifiers, categories and configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::errors::ConfigError;

/// Protocol identifier carried in the first push of every catalog script.
pub const PROTOCOL_ID: &str = "agent-catalog";

/// `OP_FALSE` / `OP_0`.
pub const OP_FALSE: u8 = 0x00;
/// `OP_RETURN`, terminates execution and marks the output as data-carrying.
pub const OP_RETURN: u8 = 0x6a;
/// Push with a 1-byte length prefix.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Push with a 2-byte little-endian length prefix.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Push with a 4-byte little-endian length prefix.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Largest length that is encoded directly in the opcode byte.
pub const MAX_DIRECT_PUSH: usize = 75;

/// Length of a hex-encoded 33-byte compressed public key.
pub const IDENTITY_KEY_HEX_LEN: usize = 66;

/// Default cap on the number of outpoints a single lookup returns.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Transactions with at least this many outputs are evaluated in parallel.
pub const PARALLEL_THRESHOLD: usize = 64;

/// A 32-byte transaction id, displayed as 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Primary key of every catalog row: one output of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpoint {
    pub txid: Txid,
    pub output_index: u32,
}

impl Outpoint {
    /// Encoded width of an outpoint inside storage keys.
    pub const KEY_LEN: usize = 36;

    pub fn new(txid: Txid, output_index: u32) -> Self {
        Self { txid, output_index }
    }

    /// Fixed-width big-endian key form: `txid || output_index`.
    pub fn to_key_bytes(&self) -> [u8; Self::KEY_LEN] {
        let mut out = [0u8; Self::KEY_LEN];
        out[..32].copy_from_slice(&self.txid.0);
        out[32..].copy_from_slice(&self.output_index.to_be_bytes());
        out
    }

    pub fn from_key_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::KEY_LEN {
            return None;
        }
        let txid = Txid::from_slice(&bytes[..32])?;
        let index: [u8; 4] = bytes[32..].try_into().ok()?;
        Some(Self::new(txid, u32::from_be_bytes(index)))
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.output_index)
    }
}

/// Record category. Selects the validator schema and the backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Identity,
    Service,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Identity, Topic::Service];

    /// Value of the payload `type` discriminator.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Topic::Identity => "identity",
            Topic::Service => "service",
        }
    }

    /// Name the host uses to route transactions to this topic manager.
    pub fn topic_name(&self) -> &'static str {
        match self {
            Topic::Identity => "tm_agent_identity",
            Topic::Service => "tm_agent_service",
        }
    }

    /// Name the host uses to route lookup questions to this catalog.
    pub fn lookup_service_name(&self) -> &'static str {
        match self {
            Topic::Identity => "ls_agent_identity",
            Topic::Service => "ls_agent_service",
        }
    }

    pub fn from_topic_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.topic_name() == name)
    }

    pub fn from_lookup_service_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.lookup_service_name() == name)
    }

    /// Single-byte discriminator used in storage keys.
    pub(crate) fn key_byte(&self) -> u8 {
        match self {
            Topic::Identity => b'i',
            Topic::Service => b's',
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Protocol identifier expected in the first script push.
    pub protocol_id: String,
    /// Maximum outpoints returned by one lookup (default: 100).
    pub max_results: usize,
    /// Output count at which admission checks run on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            protocol_id: PROTOCOL_ID.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol_id.is_empty() {
            return Err(ConfigError::EmptyProtocolId);
        }
        if self.max_results == 0 {
            return Err(ConfigError::ZeroResultLimit);
        }
        Ok(())
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `AGENT_CATALOG_PROTOCOL`
    /// - `AGENT_CATALOG_MAX_RESULTS`
    /// - `AGENT_CATALOG_PARALLEL_THRESHOLD`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(protocol) = std::env::var("AGENT_CATALOG_PROTOCOL") {
            config.protocol_id = protocol;
        }
        if let Ok(raw) = std::env::var("AGENT_CATALOG_MAX_RESULTS") {
            config.max_results = parse_env("AGENT_CATALOG_MAX_RESULTS", &raw)?;
        }
        if let Ok(raw) = std::env::var("AGENT_CATALOG_PARALLEL_THRESHOLD") {
            config.parallel_threshold = parse_env("AGENT_CATALOG_PARALLEL_THRESHOLD", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_env(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
