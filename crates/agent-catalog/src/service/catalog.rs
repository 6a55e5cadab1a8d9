//! # Catalog Index
//!
//! UTXO-tracked rows for one category over a [`KeyValueStore`].
//!
//! ## Write Path
//!
//! Every mutation builds one batch of deletes followed by puts and commits
//! it with `atomic_batch_write` while holding the index write lock. For
//! service rows the batch also retires whichever row the
//! `(identityKey, serviceId)` unique key pointed at, so two live offers for
//! the same pair can never be observed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::keys;
use crate::domain::query::{self, ScanPlan};
use crate::domain::{
    AdmitOutcome, AgentPayload, CatalogConfig, CatalogEntry, CatalogError, ConfigError,
    LookupQuery, Outpoint, PayloadValidator, ServiceMetadata, Topic,
};
use crate::ports::{BatchOperation, KeyValueStore, LookupService, SystemTimeSource, TimeSource};

/// Counters for one catalog.
#[derive(Debug, Default)]
pub struct CatalogStats {
    admitted: AtomicU64,
    rejected: AtomicU64,
    spent: AtomicU64,
    evicted: AtomicU64,
    deduplicated: AtomicU64,
}

impl CatalogStats {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self, topic: Topic, live_rows: usize) -> CatalogMetrics {
        CatalogMetrics {
            topic: topic.topic_name().to_string(),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            spent: self.spent.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            live_rows,
        }
    }
}

/// Point-in-time view of [`CatalogStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetrics {
    pub topic: String,
    pub admitted: u64,
    pub rejected: u64,
    pub spent: u64,
    pub evicted: u64,
    pub deduplicated: u64,
    pub live_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Spent,
    Evicted,
}

impl Removal {
    fn as_str(&self) -> &'static str {
        match self {
            Removal::Spent => "spent",
            Removal::Evicted => "evicted",
        }
    }
}

/// Index of one category's live outputs.
pub struct CatalogIndex<S: KeyValueStore> {
    topic: Topic,
    store: RwLock<S>,
    validator: PayloadValidator,
    time_source: Arc<dyn TimeSource>,
    max_results: usize,
    stats: CatalogStats,
}

impl<S: KeyValueStore> CatalogIndex<S> {
    pub fn new(topic: Topic, store: S, config: &CatalogConfig) -> Result<Self, ConfigError> {
        Self::with_time_source(topic, store, config, Arc::new(SystemTimeSource))
    }

    /// Fails if `config` does not validate.
    pub fn with_time_source(
        topic: Topic,
        store: S,
        config: &CatalogConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            topic,
            store: RwLock::new(store),
            validator: PayloadValidator::new(config.protocol_id.clone()),
            time_source,
            max_results: config.max_results,
            stats: CatalogStats::default(),
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Re-check an admitted output and upsert its row.
    pub fn on_admitted(
        &self,
        outpoint: Outpoint,
        script: &[u8],
    ) -> Result<AdmitOutcome, CatalogError> {
        let payload = match self.validator.check_bytes(script, self.topic) {
            Ok(payload) => payload,
            Err(reason) => {
                debug!(
                    "[catalog] {} ignoring admitted output {}: {}",
                    self.topic.topic_name(),
                    outpoint,
                    reason
                );
                CatalogStats::bump(&self.stats.rejected, 1);
                return Ok(AdmitOutcome::Rejected(reason));
            }
        };

        let entry = CatalogEntry {
            outpoint,
            payload,
            indexed_at: self.time_source.now(),
        };
        let row_bytes = bincode::serialize(&entry)?;

        let mut store = self.store.write();
        let mut deletes = Vec::new();

        let row_key = keys::row_key(self.topic, &outpoint);
        let replaced = match store.get(&row_key)? {
            Some(bytes) => {
                let previous = decode_row(&bytes)?;
                deletes.extend(removal_ops(&*store, &previous)?);
                true
            }
            None => false,
        };

        let mut superseded = Vec::new();
        let unique_key = match &entry.payload {
            AgentPayload::Service(record) => {
                let unique_key = keys::service_unique_key(&record.identity_key, &record.service_id);
                if let Some(owner) = store.get(&unique_key)? {
                    let owner = Outpoint::from_key_bytes(&owner).ok_or_else(|| {
                        CatalogError::CorruptKey {
                            message: format!("unique key owner for {}", record.service_id),
                        }
                    })?;
                    if owner != outpoint {
                        if let Some(bytes) = store.get(&keys::row_key(self.topic, &owner))? {
                            let previous = decode_row(&bytes)?;
                            deletes.extend(removal_ops(&*store, &previous)?);
                            superseded.push(owner);
                        }
                    }
                }
                Some(unique_key)
            }
            AgentPayload::Identity(_) => None,
        };

        let mut batch = deletes;
        batch.push(BatchOperation::put(row_key, row_bytes));
        for index_key in keys::index_keys(&entry) {
            batch.push(BatchOperation::put(index_key, Vec::new()));
        }
        if let Some(unique_key) = unique_key {
            batch.push(BatchOperation::put(unique_key, outpoint.to_key_bytes().to_vec()));
        }
        store.atomic_batch_write(batch)?;
        drop(store);

        CatalogStats::bump(&self.stats.admitted, 1);
        CatalogStats::bump(&self.stats.deduplicated, superseded.len() as u64);
        for old in &superseded {
            warn!(
                "[catalog] {} superseded {} with {} for provider {}",
                self.topic.topic_name(),
                old,
                outpoint,
                entry.payload.identity_key()
            );
        }
        info!(
            "[catalog] {} indexed {}{}",
            self.topic.topic_name(),
            outpoint,
            if replaced { " (overwrite)" } else { "" }
        );

        Ok(AdmitOutcome::Indexed {
            replaced,
            superseded,
        })
    }

    /// Remove the row for a spent output. Idempotent.
    pub fn on_spent(&self, outpoint: Outpoint) -> Result<bool, CatalogError> {
        self.remove(outpoint, Removal::Spent)
    }

    /// Remove the row for an evicted output. Idempotent.
    pub fn on_evicted(&self, outpoint: Outpoint) -> Result<bool, CatalogError> {
        self.remove(outpoint, Removal::Evicted)
    }

    fn remove(&self, outpoint: Outpoint, removal: Removal) -> Result<bool, CatalogError> {
        let mut store = self.store.write();
        let Some(bytes) = store.get(&keys::row_key(self.topic, &outpoint))? else {
            return Ok(false);
        };
        let entry = decode_row(&bytes)?;
        let batch = removal_ops(&*store, &entry)?;
        store.atomic_batch_write(batch)?;
        drop(store);

        let counter = match removal {
            Removal::Spent => &self.stats.spent,
            Removal::Evicted => &self.stats.evicted,
        };
        CatalogStats::bump(counter, 1);
        info!(
            "[catalog] {} removed {} ({})",
            self.topic.topic_name(),
            outpoint,
            removal.as_str()
        );
        Ok(true)
    }

    /// Outpoints of rows matching every filter field, at most `max_results`.
    ///
    /// No ordering is guaranteed across calls.
    pub fn query(&self, query: &LookupQuery) -> Result<Vec<Outpoint>, CatalogError> {
        Ok(self
            .query_entries(query)?
            .into_iter()
            .map(|entry| entry.outpoint)
            .collect())
    }

    /// Full rows matching the query, at most `max_results`.
    pub fn query_entries(&self, query: &LookupQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        if query.topic() != self.topic {
            return Err(CatalogError::TopicMismatch {
                expected: self.topic,
                actual: query.topic(),
            });
        }

        let store = self.store.read();
        let mut results = Vec::new();
        let limit = self.max_results;

        // Scans are lazy; each loop stops as soon as the cap is reached.
        match query::plan(query) {
            ScanPlan::FullScan { prefix } => {
                for item in store.prefix_iter(&prefix) {
                    let (_, bytes) = item?;
                    let entry = decode_row(&bytes)?;
                    if query::matches(query, &entry) {
                        results.push(entry);
                        if results.len() >= limit {
                            break;
                        }
                    }
                }
            }
            ScanPlan::IndexEq { prefix } => {
                for item in store.prefix_iter(&prefix) {
                    let (key, _) = item?;
                    if let Some(entry) = self.indexed_row(&*store, &key)? {
                        if query::matches(query, &entry) {
                            results.push(entry);
                            if results.len() >= limit {
                                break;
                            }
                        }
                    }
                }
            }
            ScanPlan::PriceAtMost { field_prefix, max } => {
                // Prices are fixed-width big-endian, so the scan is price-ordered.
                for item in store.prefix_iter(&field_prefix) {
                    let (key, _) = item?;
                    let price = keys::index_value(&key, &field_prefix)
                        .and_then(|v| <[u8; 8]>::try_from(v).ok())
                        .map(u64::from_be_bytes)
                        .ok_or_else(|| CatalogError::CorruptKey {
                            message: "price index entry".to_string(),
                        })?;
                    if price > max {
                        break;
                    }
                    if let Some(entry) = self.indexed_row(&*store, &key)? {
                        if query::matches(query, &entry) {
                            results.push(entry);
                            if results.len() >= limit {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Ok(results)
    }

    fn indexed_row(&self, store: &S, index_key: &[u8]) -> Result<Option<CatalogEntry>, CatalogError> {
        let outpoint =
            keys::trailing_outpoint(index_key).ok_or_else(|| CatalogError::CorruptKey {
                message: format!("index key of {} bytes", index_key.len()),
            })?;
        match store.get(&keys::row_key(self.topic, &outpoint))? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => {
                warn!(
                    "[catalog] {} index entry points at missing row {}",
                    self.topic.topic_name(),
                    outpoint
                );
                Ok(None)
            }
        }
    }

    /// Stored row at an outpoint, if live.
    pub fn entry(&self, outpoint: &Outpoint) -> Result<Option<CatalogEntry>, CatalogError> {
        let store = self.store.read();
        store
            .get(&keys::row_key(self.topic, outpoint))?
            .map(|bytes| decode_row(&bytes))
            .transpose()
    }

    /// Number of live rows.
    pub fn len(&self) -> Result<usize, CatalogError> {
        let store = self.store.read();
        Ok(store.prefix_count(&keys::row_prefix(self.topic))?)
    }

    pub fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.len()? == 0)
    }

    pub fn metrics(&self) -> Result<CatalogMetrics, CatalogError> {
        Ok(self.stats.snapshot(self.topic, self.len()?))
    }
}

impl<S: KeyValueStore> LookupService for CatalogIndex<S> {
    fn topic(&self) -> Topic {
        self.topic
    }

    fn output_admitted(
        &self,
        outpoint: Outpoint,
        script: &[u8],
    ) -> Result<AdmitOutcome, CatalogError> {
        self.on_admitted(outpoint, script)
    }

    fn output_spent(&self, outpoint: Outpoint) -> Result<bool, CatalogError> {
        self.on_spent(outpoint)
    }

    fn output_evicted(&self, outpoint: Outpoint) -> Result<bool, CatalogError> {
        self.on_evicted(outpoint)
    }

    fn lookup(&self, query: &LookupQuery) -> Result<Vec<Outpoint>, CatalogError> {
        self.query(query)
    }

    fn entry(&self, outpoint: &Outpoint) -> Result<Option<CatalogEntry>, CatalogError> {
        CatalogIndex::entry(self, outpoint)
    }

    fn documentation(&self) -> String {
        match self.topic {
            Topic::Identity => "# Agent identity lookup\n\n\
                 Query with `{\"identityKey\"?, \"name\"?, \"capability\"?}`. `identityKey` is \
                 an exact match, `name` a case-insensitive substring and `capability` a \
                 substring of the JSON-encoded capability list. Fields combine with AND; an \
                 empty query lists every agent. Answers are outpoints, capped per query."
                .to_string(),
            Topic::Service => "# Agent service lookup\n\n\
                 Query with `{\"serviceType\"?, \"maxPriceSats\"?, \"provider\"?}`. \
                 `serviceType` matches `serviceId` exactly, `provider` matches `identityKey` \
                 exactly and `maxPriceSats` is an inclusive upper bound on `amountSats`. \
                 Only the newest offer per provider and service is kept."
                .to_string(),
        }
    }

    fn metadata(&self) -> ServiceMetadata {
        let short_description = match self.topic {
            Topic::Identity => "Find agents by key, name or capability",
            Topic::Service => "Find agent services by type, provider or price",
        };
        ServiceMetadata {
            name: self.topic.lookup_service_name().to_string(),
            short_description: short_description.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn decode_row(bytes: &[u8]) -> Result<CatalogEntry, CatalogError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Deletes for a row, its index entries and, if it still owns it, its
/// service unique key.
fn removal_ops<S: KeyValueStore + ?Sized>(
    store: &S,
    entry: &CatalogEntry,
) -> Result<Vec<BatchOperation>, CatalogError> {
    let topic = entry.payload.topic();
    let mut ops = vec![BatchOperation::delete(keys::row_key(topic, &entry.outpoint))];
    ops.extend(keys::index_keys(entry).into_iter().map(BatchOperation::delete));

    if let AgentPayload::Service(record) = &entry.payload {
        let unique_key = keys::service_unique_key(&record.identity_key, &record.service_id);
        if let Some(owner) = store.get(&unique_key)? {
            if owner.as_slice() == entry.outpoint.to_key_bytes().as_slice() {
                ops.push(BatchOperation::delete(unique_key));
            }
        }
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codec::encode;
    use crate::domain::value_objects::{Txid, PROTOCOL_ID};
    use crate::domain::{
        AgentQuery, IdentityRecord, Pricing, RejectReason, ServiceQuery, ServiceRecord,
    };
    use crate::domain::KVStoreError;
    use crate::ports::{FixedTimeSource, InMemoryKVStore, KvIter};
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;

    /// In-memory store that counts every row handed back to the catalog.
    struct CountingStore {
        inner: InMemoryKVStore,
        reads: Arc<AtomicUsize>,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.get(key)
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
            self.inner.delete(key)
        }

        fn atomic_batch_write(&mut self, ops: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            self.inner.atomic_batch_write(ops)
        }

        fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
            self.inner.exists(key)
        }

        fn prefix_iter<'a>(&'a self, prefix: &[u8]) -> KvIter<'a> {
            let reads = Arc::clone(&self.reads);
            Box::new(self.inner.prefix_iter(prefix).inspect(move |_| {
                reads.fetch_add(1, Ordering::Relaxed);
            }))
        }
    }

    fn key(b: u8) -> String {
        format!("02{}", hex::encode([b; 32]))
    }

    fn outpoint(b: u8, vout: u32) -> Outpoint {
        Outpoint::new(Txid([b; 32]), vout)
    }

    fn identity_script(key_byte: u8, name: &str, capabilities: &[&str]) -> Vec<u8> {
        let record = IdentityRecord {
            identity_key: key(key_byte),
            name: name.to_string(),
            description: String::new(),
            channels: BTreeMap::new(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            timestamp: "2026-03-01T00:00:00Z".to_string(),
        };
        encode(&AgentPayload::Identity(record), PROTOCOL_ID)
    }

    fn service_script(key_byte: u8, service_id: &str, amount_sats: u64) -> Vec<u8> {
        let record = ServiceRecord {
            identity_key: key(key_byte),
            service_id: service_id.to_string(),
            name: service_id.to_uppercase(),
            description: String::new(),
            pricing: Pricing {
                model: "per-call".to_string(),
                amount_sats,
            },
            timestamp: "2026-03-01T00:00:00Z".to_string(),
        };
        encode(&AgentPayload::Service(record), PROTOCOL_ID)
    }

    fn catalog(topic: Topic) -> CatalogIndex<InMemoryKVStore> {
        CatalogIndex::with_time_source(
            topic,
            InMemoryKVStore::new(),
            &CatalogConfig::default(),
            Arc::new(FixedTimeSource(1_750_000_000)),
        )
        .unwrap()
    }

    #[test]
    fn test_admit_lookup_spend_lifecycle() {
        let catalog = catalog(Topic::Identity);
        let op = outpoint(1, 0);
        let outcome = catalog
            .on_admitted(op, &identity_script(9, "Scribe", &["write"]))
            .unwrap();
        assert_eq!(
            outcome,
            AdmitOutcome::Indexed {
                replaced: false,
                superseded: vec![]
            }
        );

        let query = LookupQuery::Agent(AgentQuery::by_identity_key(key(9)));
        assert_eq!(catalog.query(&query).unwrap(), vec![op]);
        assert_eq!(catalog.entry(&op).unwrap().unwrap().indexed_at, 1_750_000_000);

        assert!(catalog.on_spent(op).unwrap());
        assert!(catalog.query(&query).unwrap().is_empty());
        assert!(!catalog.on_spent(op).unwrap());
        assert!(catalog.is_empty().unwrap());
    }

    #[test]
    fn test_rejected_admission_writes_nothing() {
        let catalog = catalog(Topic::Identity);
        let outcome = catalog
            .on_admitted(outpoint(1, 0), &service_script(1, "chat", 5))
            .unwrap();
        assert!(matches!(
            outcome,
            AdmitOutcome::Rejected(RejectReason::TypeMismatch { .. })
        ));
        assert!(catalog.is_empty().unwrap());
        assert_eq!(catalog.metrics().unwrap().rejected, 1);
    }

    #[test]
    fn test_readmission_overwrites_and_reindexes() {
        let catalog = catalog(Topic::Identity);
        let op = outpoint(2, 1);
        catalog.on_admitted(op, &identity_script(1, "Old Name", &[])).unwrap();
        let outcome = catalog
            .on_admitted(op, &identity_script(1, "New Name", &[]))
            .unwrap();
        assert!(matches!(outcome, AdmitOutcome::Indexed { replaced: true, .. }));

        assert_eq!(catalog.len().unwrap(), 1);
        let by_old = LookupQuery::Agent(AgentQuery::by_name("old"));
        let by_new = LookupQuery::Agent(AgentQuery::by_name("NEW"));
        assert!(catalog.query(&by_old).unwrap().is_empty());
        assert_eq!(catalog.query(&by_new).unwrap(), vec![op]);
    }

    #[test]
    fn test_service_dedup_keeps_newest() {
        let catalog = catalog(Topic::Service);
        let first = outpoint(3, 0);
        let second = outpoint(4, 0);
        catalog.on_admitted(first, &service_script(5, "translate", 100)).unwrap();
        let outcome = catalog
            .on_admitted(second, &service_script(5, "translate", 80))
            .unwrap();
        assert_eq!(
            outcome,
            AdmitOutcome::Indexed {
                replaced: false,
                superseded: vec![first]
            }
        );

        let all = LookupQuery::Service(ServiceQuery::default());
        assert_eq!(catalog.query(&all).unwrap(), vec![second]);
        assert!(catalog.entry(&first).unwrap().is_none());
        assert_eq!(catalog.metrics().unwrap().deduplicated, 1);

        // Spending the superseded outpoint must not disturb the live offer.
        assert!(!catalog.on_spent(first).unwrap());
        let by_type = LookupQuery::Service(ServiceQuery::by_service_type("translate"));
        assert_eq!(catalog.query(&by_type).unwrap(), vec![second]);
    }

    #[test]
    fn test_spend_releases_unique_key() {
        let catalog = catalog(Topic::Service);
        catalog.on_admitted(outpoint(1, 0), &service_script(5, "chat", 1)).unwrap();
        catalog.on_spent(outpoint(1, 0)).unwrap();
        let outcome = catalog
            .on_admitted(outpoint(2, 0), &service_script(5, "chat", 2))
            .unwrap();
        assert_eq!(
            outcome,
            AdmitOutcome::Indexed {
                replaced: false,
                superseded: vec![]
            }
        );
    }

    #[test]
    fn test_different_providers_do_not_dedup() {
        let catalog = catalog(Topic::Service);
        catalog.on_admitted(outpoint(1, 0), &service_script(5, "chat", 1)).unwrap();
        catalog.on_admitted(outpoint(2, 0), &service_script(6, "chat", 1)).unwrap();
        catalog.on_admitted(outpoint(3, 0), &service_script(5, "draw", 1)).unwrap();
        assert_eq!(catalog.len().unwrap(), 3);
    }

    #[test]
    fn test_price_bound_is_inclusive() {
        let catalog = catalog(Topic::Service);
        catalog.on_admitted(outpoint(1, 0), &service_script(1, "a", 99)).unwrap();
        catalog.on_admitted(outpoint(2, 0), &service_script(2, "b", 100)).unwrap();
        catalog.on_admitted(outpoint(3, 0), &service_script(3, "c", 101)).unwrap();

        let query = LookupQuery::Service(ServiceQuery::default().with_max_price(100));
        let mut found = catalog.query(&query).unwrap();
        found.sort_by_key(|op| op.txid.0[0]);
        assert_eq!(found, vec![outpoint(1, 0), outpoint(2, 0)]);
    }

    #[test]
    fn test_filters_are_conjunctive_across_index_and_predicate() {
        let catalog = catalog(Topic::Service);
        catalog.on_admitted(outpoint(1, 0), &service_script(1, "chat", 10)).unwrap();
        catalog.on_admitted(outpoint(2, 0), &service_script(1, "draw", 500)).unwrap();

        let query = LookupQuery::Service(ServiceQuery::by_provider(key(1)).with_max_price(50));
        assert_eq!(catalog.query(&query).unwrap(), vec![outpoint(1, 0)]);
    }

    #[test]
    fn test_empty_query_is_capped() {
        let catalog = catalog(Topic::Identity);
        for i in 0..150u32 {
            let op = Outpoint::new(Txid([(i % 251) as u8; 32]), i);
            catalog.on_admitted(op, &identity_script(1, "bulk", &[])).unwrap();
        }
        assert_eq!(catalog.len().unwrap(), 150);

        let all = LookupQuery::Agent(AgentQuery::default());
        assert_eq!(catalog.query(&all).unwrap().len(), 100);
    }

    #[test]
    fn test_capped_lookup_stops_reading_at_the_cap() {
        let reads = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: InMemoryKVStore::new(),
            reads: Arc::clone(&reads),
        };
        let config = CatalogConfig::default();
        let catalog = CatalogIndex::with_time_source(
            Topic::Identity,
            store,
            &config,
            Arc::new(FixedTimeSource(1_750_000_000)),
        )
        .unwrap();
        for i in 0..5_000u32 {
            let op = Outpoint::new(Txid([(i % 251) as u8; 32]), i);
            catalog.on_admitted(op, &identity_script(1, "bulk", &[])).unwrap();
        }

        reads.store(0, Ordering::Relaxed);
        let all = LookupQuery::Agent(AgentQuery::default());
        assert_eq!(catalog.query(&all).unwrap().len(), config.max_results);
        assert!(reads.load(Ordering::Relaxed) <= config.max_results + 1);

        reads.store(0, Ordering::Relaxed);
        let by_name = LookupQuery::Agent(AgentQuery::by_name("bulk"));
        assert_eq!(catalog.query(&by_name).unwrap().len(), config.max_results);
        // One index entry plus one row fetch per result.
        assert!(reads.load(Ordering::Relaxed) <= 2 * config.max_results + 1);
    }

    #[test]
    fn test_long_service_ids_differing_late_stay_distinct() {
        let catalog = catalog(Topic::Service);
        let shared = "a".repeat(65_535);
        let first = format!("{}x", shared);
        let second = format!("{}y", shared);

        catalog.on_admitted(outpoint(1, 0), &service_script(5, &first, 1)).unwrap();
        let outcome = catalog
            .on_admitted(outpoint(2, 0), &service_script(5, &second, 1))
            .unwrap();
        assert_eq!(
            outcome,
            AdmitOutcome::Indexed {
                replaced: false,
                superseded: vec![]
            }
        );

        assert_eq!(catalog.len().unwrap(), 2);
        assert!(catalog.entry(&outpoint(1, 0)).unwrap().is_some());
        assert!(catalog.entry(&outpoint(2, 0)).unwrap().is_some());
        let by_type = LookupQuery::Service(ServiceQuery::by_service_type(&second));
        assert_eq!(catalog.query(&by_type).unwrap(), vec![outpoint(2, 0)]);
    }

    #[test]
    fn test_capability_substring_match() {
        let catalog = catalog(Topic::Identity);
        catalog
            .on_admitted(outpoint(1, 0), &identity_script(1, "a", &["translate"]))
            .unwrap();
        let query = LookupQuery::Agent(AgentQuery::by_capability("trans"));
        assert_eq!(catalog.query(&query).unwrap().len(), 1);
        let query = LookupQuery::Agent(AgentQuery::by_capability("Translate"));
        assert!(catalog.query(&query).unwrap().is_empty());
    }

    #[test]
    fn test_query_for_other_topic_is_error() {
        let catalog = catalog(Topic::Identity);
        let err = catalog
            .query(&LookupQuery::Service(ServiceQuery::default()))
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::TopicMismatch {
                expected: Topic::Identity,
                actual: Topic::Service
            }
        );
    }

    #[test]
    fn test_evicted_counts_separately() {
        let catalog = catalog(Topic::Identity);
        catalog.on_admitted(outpoint(1, 0), &identity_script(1, "x", &[])).unwrap();
        assert!(catalog.on_evicted(outpoint(1, 0)).unwrap());
        let metrics = catalog.metrics().unwrap();
        assert_eq!(metrics.evicted, 1);
        assert_eq!(metrics.spent, 0);
        assert_eq!(metrics.live_rows, 0);
    }
}
