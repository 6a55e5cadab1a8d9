//! # Query Engine
//!
//! Turns a [`LookupQuery`] into a scan plan over the key layout and a row
//! predicate. Every filter field is applied by [`matches`], whatever the
//! plan, so the plan only narrows which rows are read.

use super::entities::{AgentPayload, AgentQuery, CatalogEntry, LookupQuery, ServiceQuery};
use super::keys::{self, IndexField};
use super::value_objects::Topic;

/// Which keys a lookup reads to find candidate rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Every row of the topic.
    FullScan { prefix: Vec<u8> },
    /// Index entries for one exact column value.
    IndexEq { prefix: Vec<u8> },
    /// Price index entries at or below a bound.
    PriceAtMost { field_prefix: Vec<u8>, max: u64 },
}

/// Pick the narrowest scan for a query.
pub fn plan(query: &LookupQuery) -> ScanPlan {
    match query {
        LookupQuery::Agent(q) => match &q.identity_key {
            Some(key) => ScanPlan::IndexEq {
                prefix: keys::index_value_prefix(
                    Topic::Identity,
                    IndexField::IdentityKey,
                    key.as_bytes(),
                ),
            },
            None => ScanPlan::FullScan {
                prefix: keys::row_prefix(Topic::Identity),
            },
        },
        LookupQuery::Service(q) => {
            if let Some(provider) = &q.provider {
                ScanPlan::IndexEq {
                    prefix: keys::index_value_prefix(
                        Topic::Service,
                        IndexField::IdentityKey,
                        provider.as_bytes(),
                    ),
                }
            } else if let Some(service_type) = &q.service_type {
                ScanPlan::IndexEq {
                    prefix: keys::index_value_prefix(
                        Topic::Service,
                        IndexField::ServiceId,
                        service_type.as_bytes(),
                    ),
                }
            } else if let Some(max) = q.max_price_sats {
                ScanPlan::PriceAtMost {
                    field_prefix: keys::index_field_prefix(Topic::Service, IndexField::PricingSats),
                    max,
                }
            } else {
                ScanPlan::FullScan {
                    prefix: keys::row_prefix(Topic::Service),
                }
            }
        }
    }
}

/// True if the row satisfies every filter field of the query.
pub fn matches(query: &LookupQuery, entry: &CatalogEntry) -> bool {
    match (query, &entry.payload) {
        (LookupQuery::Agent(q), AgentPayload::Identity(_)) => matches_agent(q, entry),
        (LookupQuery::Service(q), AgentPayload::Service(_)) => matches_service(q, entry),
        _ => false,
    }
}

fn matches_agent(query: &AgentQuery, entry: &CatalogEntry) -> bool {
    let AgentPayload::Identity(record) = &entry.payload else {
        return false;
    };

    if let Some(key) = &query.identity_key {
        if &record.identity_key != key {
            return false;
        }
    }
    if let Some(name) = &query.name {
        if !record.name.to_lowercase().contains(&name.to_lowercase()) {
            return false;
        }
    }
    if let Some(capability) = &query.capability {
        // Substring of the serialized list: `"tr"` also matches `["translate"]`.
        match entry.serialized_capabilities() {
            Some(serialized) if serialized.contains(capability.as_str()) => {}
            _ => return false,
        }
    }
    true
}

fn matches_service(query: &ServiceQuery, entry: &CatalogEntry) -> bool {
    let AgentPayload::Service(record) = &entry.payload else {
        return false;
    };

    if let Some(service_type) = &query.service_type {
        if &record.service_id != service_type {
            return false;
        }
    }
    if let Some(provider) = &query.provider {
        if &record.identity_key != provider {
            return false;
        }
    }
    if let Some(max) = query.max_price_sats {
        if record.pricing.amount_sats > max {
            return false;
        }
    }
    true
}
