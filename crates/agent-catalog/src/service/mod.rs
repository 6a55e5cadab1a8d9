//! # Catalog Service
//!
//! Wires both topic managers and both catalog indexes behind the callback
//! contract an overlay host drives.

pub mod catalog;
pub mod topic_manager;

pub use catalog::{CatalogIndex, CatalogMetrics, CatalogStats};
pub use topic_manager::AgentTopicManager;

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    AdmitOutcome, AdmittanceInstructions, CatalogConfig, CatalogEntry, CatalogError, ConfigError,
    LookupQuery, LookupQuestion, Outpoint, QueryError, RawOutput, ServiceMetadata, Topic, Txid,
};
use crate::ports::{
    InMemoryKVStore, KeyValueStore, LookupService, SystemTimeSource, TimeSource, TopicManager,
};

/// Both categories of the agent catalog over one storage backend type.
pub struct CatalogService<S: KeyValueStore> {
    config: CatalogConfig,
    identity_manager: AgentTopicManager,
    service_manager: AgentTopicManager,
    identity_index: CatalogIndex<S>,
    service_index: CatalogIndex<S>,
}

impl CatalogService<InMemoryKVStore> {
    /// Catalog over in-memory tables.
    pub fn in_memory(config: CatalogConfig) -> Result<Self, ConfigError> {
        Self::new(config, InMemoryKVStore::new(), InMemoryKVStore::new())
    }
}

impl<S: KeyValueStore> CatalogService<S> {
    pub fn new(
        config: CatalogConfig,
        identity_store: S,
        service_store: S,
    ) -> Result<Self, ConfigError> {
        Self::with_time_source(
            config,
            identity_store,
            service_store,
            Arc::new(SystemTimeSource),
        )
    }

    /// Fails if `config` does not validate.
    pub fn with_time_source(
        config: CatalogConfig,
        identity_store: S,
        service_store: S,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            identity_manager: AgentTopicManager::identity(&config),
            service_manager: AgentTopicManager::service(&config),
            identity_index: CatalogIndex::with_time_source(
                Topic::Identity,
                identity_store,
                &config,
                Arc::clone(&time_source),
            )?,
            service_index: CatalogIndex::with_time_source(
                Topic::Service,
                service_store,
                &config,
                time_source,
            )?,
            config,
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn topic_manager(&self, topic: Topic) -> &AgentTopicManager {
        match topic {
            Topic::Identity => &self.identity_manager,
            Topic::Service => &self.service_manager,
        }
    }

    pub fn catalog(&self, topic: Topic) -> &CatalogIndex<S> {
        match topic {
            Topic::Identity => &self.identity_index,
            Topic::Service => &self.service_index,
        }
    }

    pub fn identify_admissible_outputs(
        &self,
        topic: Topic,
        outputs: &[RawOutput],
    ) -> AdmittanceInstructions {
        self.topic_manager(topic).identify_admissible_outputs(outputs)
    }

    pub fn on_output_admitted(
        &self,
        topic: Topic,
        txid: Txid,
        output_index: u32,
        script: &[u8],
    ) -> Result<AdmitOutcome, CatalogError> {
        self.catalog(topic)
            .on_admitted(Outpoint::new(txid, output_index), script)
    }

    pub fn on_output_spent(
        &self,
        topic: Topic,
        txid: Txid,
        output_index: u32,
    ) -> Result<bool, CatalogError> {
        self.catalog(topic).on_spent(Outpoint::new(txid, output_index))
    }

    /// Evictions are not scoped to a topic; the outpoint is dropped from
    /// every category. Returns whether any row was removed.
    pub fn on_output_evicted(&self, txid: Txid, output_index: u32) -> Result<bool, CatalogError> {
        let outpoint = Outpoint::new(txid, output_index);
        let mut removed = false;
        for topic in Topic::ALL {
            removed |= self.catalog(topic).on_evicted(outpoint)?;
        }
        if !removed {
            debug!("[catalog] eviction of untracked output {}", outpoint);
        }
        Ok(removed)
    }

    pub fn lookup(&self, query: &LookupQuery) -> Result<Vec<Outpoint>, CatalogError> {
        self.catalog(query.topic()).query(query)
    }

    pub fn lookup_question(&self, question: &LookupQuestion) -> Result<Vec<Outpoint>, QueryError> {
        let query = question.parse()?;
        Ok(self.lookup(&query)?)
    }

    pub fn entry(
        &self,
        topic: Topic,
        outpoint: &Outpoint,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        self.catalog(topic).entry(outpoint)
    }

    pub fn metrics(&self) -> Result<Vec<CatalogMetrics>, CatalogError> {
        Topic::ALL
            .iter()
            .map(|topic| self.catalog(*topic).metrics())
            .collect()
    }

    /// Descriptors of every topic manager followed by every lookup service.
    pub fn list_topics(&self) -> Vec<ServiceMetadata> {
        let managers = Topic::ALL
            .iter()
            .map(|topic| self.topic_manager(*topic).metadata());
        let lookups = Topic::ALL
            .iter()
            .map(|topic| self.catalog(*topic).metadata());
        managers.chain(lookups).collect()
    }
}
