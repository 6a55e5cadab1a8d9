//! # Storage Key Layout
//!
//! Every category shares one key-value namespace, separated by a topic byte.
//!
//! | Prefix | Layout | Value |
//! |--------|--------|-------|
//! | `r:` | `r:{topic}{txid}{vout}` | bincode `CatalogEntry` |
//! | `x:` | `x:{topic}{field}{len:u32}{value}{txid}{vout}` | empty |
//! | `u:` | `u:{topic}{len:u32}{identityKey}{len:u32}{serviceId}` | `{txid}{vout}` |
//!
//! Outpoints are always the trailing 36 bytes of row and index keys. Index
//! values are length-prefixed so one value can never be a prefix of another.

use super::entities::{AgentPayload, CatalogEntry};
use super::value_objects::{Outpoint, Topic};

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Primary rows.
    Row,
    /// Secondary index entries.
    Index,
    /// Uniqueness constraints.
    Unique,
}

impl KeyPrefix {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Row => b"r:",
            KeyPrefix::Index => b"x:",
            KeyPrefix::Unique => b"u:",
        }
    }

    fn for_topic(&self, topic: Topic) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.push(topic.key_byte());
        key
    }
}

/// Secondary-indexed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    IdentityKey,
    /// Lowercased name.
    Name,
    ServiceId,
    /// Big-endian `u64`, so index order is price order.
    PricingSats,
}

impl IndexField {
    fn byte(&self) -> u8 {
        match self {
            IndexField::IdentityKey => b'k',
            IndexField::Name => b'n',
            IndexField::ServiceId => b'd',
            IndexField::PricingSats => b'p',
        }
    }
}

const LEN_PREFIX: usize = 4;

// Field values come from one script push, whose length is at most u32::MAX.
fn push_len_prefixed(key: &mut Vec<u8>, value: &[u8]) {
    key.extend_from_slice(&(value.len() as u32).to_be_bytes());
    key.extend_from_slice(value);
}

/// Prefix shared by every row of a topic.
pub fn row_prefix(topic: Topic) -> Vec<u8> {
    KeyPrefix::Row.for_topic(topic)
}

pub fn row_key(topic: Topic, outpoint: &Outpoint) -> Vec<u8> {
    let mut key = row_prefix(topic);
    key.extend_from_slice(&outpoint.to_key_bytes());
    key
}

/// Prefix of every index entry for one column of a topic.
pub fn index_field_prefix(topic: Topic, field: IndexField) -> Vec<u8> {
    let mut key = KeyPrefix::Index.for_topic(topic);
    key.push(field.byte());
    key
}

/// Prefix of every index entry for one exact column value.
pub fn index_value_prefix(topic: Topic, field: IndexField, value: &[u8]) -> Vec<u8> {
    let mut key = index_field_prefix(topic, field);
    push_len_prefixed(&mut key, value);
    key
}

pub fn index_key(topic: Topic, field: IndexField, value: &[u8], outpoint: &Outpoint) -> Vec<u8> {
    let mut key = index_value_prefix(topic, field, value);
    key.extend_from_slice(&outpoint.to_key_bytes());
    key
}

/// Uniqueness key for a service offer: one live row per (identityKey, serviceId).
pub fn service_unique_key(identity_key: &str, service_id: &str) -> Vec<u8> {
    let mut key = KeyPrefix::Unique.for_topic(Topic::Service);
    push_len_prefixed(&mut key, identity_key.as_bytes());
    push_len_prefixed(&mut key, service_id.as_bytes());
    key
}

/// Outpoint stored in the trailing bytes of a row or index key.
pub fn trailing_outpoint(key: &[u8]) -> Option<Outpoint> {
    let start = key.len().checked_sub(Outpoint::KEY_LEN)?;
    Outpoint::from_key_bytes(&key[start..])
}

/// Indexed value stored in an index key, given its field prefix.
pub fn index_value<'a>(key: &'a [u8], field_prefix: &[u8]) -> Option<&'a [u8]> {
    let rest = key.strip_prefix(field_prefix)?;
    let len = u32::from_be_bytes(rest.get(..LEN_PREFIX)?.try_into().ok()?) as usize;
    rest.get(LEN_PREFIX..LEN_PREFIX.checked_add(len)?)
}

/// Secondary index keys an entry owns.
pub fn index_keys(entry: &CatalogEntry) -> Vec<Vec<u8>> {
    let outpoint = &entry.outpoint;
    match &entry.payload {
        AgentPayload::Identity(r) => {
            let topic = Topic::Identity;
            vec![
                index_key(topic, IndexField::IdentityKey, r.identity_key.as_bytes(), outpoint),
                index_key(topic, IndexField::Name, r.name.to_lowercase().as_bytes(), outpoint),
            ]
        }
        AgentPayload::Service(r) => {
            let topic = Topic::Service;
            vec![
                index_key(topic, IndexField::IdentityKey, r.identity_key.as_bytes(), outpoint),
                index_key(topic, IndexField::ServiceId, r.service_id.as_bytes(), outpoint),
                index_key(
                    topic,
                    IndexField::PricingSats,
                    &r.pricing.amount_sats.to_be_bytes(),
                    outpoint,
                ),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Txid;

    fn outpoint(b: u8, vout: u32) -> Outpoint {
        Outpoint::new(Txid([b; 32]), vout)
    }

    #[test]
    fn test_row_key_round_trips_outpoint() {
        let op = outpoint(0x11, 7);
        let key = row_key(Topic::Identity, &op);
        assert!(key.starts_with(&row_prefix(Topic::Identity)));
        assert!(!key.starts_with(&row_prefix(Topic::Service)));
        assert_eq!(trailing_outpoint(&key), Some(op));
    }

    #[test]
    fn test_index_values_do_not_prefix_each_other() {
        let short = index_value_prefix(Topic::Service, IndexField::ServiceId, b"chat");
        let long = index_key(Topic::Service, IndexField::ServiceId, b"chatbot", &outpoint(1, 0));
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn test_index_value_extraction() {
        let price = 1234u64.to_be_bytes();
        let key = index_key(Topic::Service, IndexField::PricingSats, &price, &outpoint(2, 1));
        let prefix = index_field_prefix(Topic::Service, IndexField::PricingSats);
        assert_eq!(index_value(&key, &prefix), Some(price.as_slice()));
        assert_eq!(trailing_outpoint(&key), Some(outpoint(2, 1)));
    }

    #[test]
    fn test_long_values_are_kept_whole() {
        let shared = "s".repeat(70_000);
        let a = format!("{}a", shared);
        let b = format!("{}b", shared);
        let key = "02".to_string() + &"ab".repeat(32);
        assert_ne!(service_unique_key(&key, &a), service_unique_key(&key, &b));

        let prefix = index_field_prefix(Topic::Service, IndexField::ServiceId);
        let index = index_key(Topic::Service, IndexField::ServiceId, a.as_bytes(), &outpoint(3, 0));
        assert_eq!(index_value(&index, &prefix), Some(a.as_bytes()));
        assert_eq!(trailing_outpoint(&index), Some(outpoint(3, 0)));
    }

    #[test]
    fn test_unique_key_separates_components() {
        assert_ne!(service_unique_key("ab", "c"), service_unique_key("a", "bc"));
    }
}
