//! # RocksDB Storage Adapter
//!
//! Persistent [`KeyValueStore`] tables for the catalog, one column family
//! per category.
//!
//! ## Column Families
//!
//! - `agent_identity` - identity rows and their indexes
//! - `agent_service` - service rows, indexes and unique keys
//! - `metadata` - schema version
//!
//! Batches go through a single `WriteBatch`, so a dedup plus upsert either
//! lands completely or not at all.

use std::sync::Arc;

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, DBCompressionType, Direction,
    IteratorMode, Options, WriteBatch, WriteOptions, DB,
};
use tracing::info;

use crate::domain::{CatalogConfig, CatalogError, KVStoreError, Topic};
use crate::ports::{BatchOperation, KeyValueStore, KvIter};
use crate::service::CatalogService;

pub const CF_IDENTITY: &str = "agent_identity";
pub const CF_SERVICE: &str = "agent_service";
pub const CF_METADATA: &str = "metadata";

pub const COLUMN_FAMILIES: &[&str] = &[CF_IDENTITY, CF_SERVICE, CF_METADATA];

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const SCHEMA_VERSION: u32 = 2;

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    /// fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/agent-catalog".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

fn io_error(op: &str, err: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, err),
    }
}

/// An open catalog database.
pub struct RocksDbStore {
    db: Arc<DB>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create the database and check its schema version.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| io_error("open", e))?;

        let store = Self {
            db: Arc::new(db),
            config,
        };
        store.check_schema()?;
        info!("[catalog] opened RocksDB at {}", store.config.path);
        Ok(store)
    }

    fn check_schema(&self) -> Result<(), KVStoreError> {
        let mut metadata = self.table(CF_METADATA);
        match metadata.get(SCHEMA_VERSION_KEY)? {
            None => metadata.put(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_be_bytes()),
            Some(raw) if raw.as_slice() == SCHEMA_VERSION.to_be_bytes().as_slice() => Ok(()),
            Some(raw) => Err(KVStoreError::CorruptionError {
                message: format!("unsupported catalog schema version {}", hex::encode(raw)),
            }),
        }
    }

    fn table(&self, column_family: &'static str) -> RocksDbTable {
        RocksDbTable {
            db: Arc::clone(&self.db),
            column_family,
            sync_writes: self.config.sync_writes,
        }
    }

    /// Table backing one category.
    pub fn topic_table(&self, topic: Topic) -> RocksDbTable {
        match topic {
            Topic::Identity => self.table(CF_IDENTITY),
            Topic::Service => self.table(CF_SERVICE),
        }
    }
}

/// One column family viewed as a [`KeyValueStore`].
pub struct RocksDbTable {
    db: Arc<DB>,
    column_family: &'static str,
    sync_writes: bool,
}

impl RocksDbTable {
    fn cf(&self) -> Result<&ColumnFamily, KVStoreError> {
        self.db
            .cf_handle(self.column_family)
            .ok_or_else(|| KVStoreError::MissingTable {
                name: self.column_family.to_string(),
            })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}

impl KeyValueStore for RocksDbTable {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db
            .get_cf(self.cf()?, key)
            .map_err(|e| io_error("get", e))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .put_cf_opt(self.cf()?, key, value, &self.write_opts())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .delete_cf_opt(self.cf()?, key, &self.write_opts())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let cf = self.cf()?;
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put_cf(cf, &key, &value),
                BatchOperation::Delete { key } => batch.delete_cf(cf, &key),
            }
        }
        self.db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| io_error("batch write", e))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.db
            .get_pinned_cf(self.cf()?, key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn prefix_iter<'a>(&'a self, prefix: &[u8]) -> KvIter<'a> {
        let cf = match self.cf() {
            Ok(cf) => cf,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        let prefix = prefix.to_vec();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        Box::new(
            iter.map(|item| {
                item.map(|(key, value)| (key.to_vec(), value.to_vec()))
                    .map_err(|e| io_error("scan", e))
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            }),
        )
    }
}

/// Open a catalog whose tables live in RocksDB. The configuration is
/// validated before the database is touched.
pub fn open_catalog(
    config: CatalogConfig,
    db_config: RocksDbConfig,
) -> Result<CatalogService<RocksDbTable>, CatalogError> {
    config.validate()?;
    let store = RocksDbStore::open(db_config)?;
    Ok(CatalogService::new(
        config,
        store.topic_table(Topic::Identity),
        store.topic_table(Topic::Service),
    )?)
}
