//! # Agent Catalog
//!
//! An overlay catalog of AI-agent identities and the services they sell.
//! Agents publish records as data-carrier outputs; the catalog admits the
//! outputs that parse, keeps one row per live output, drops rows when their
//! outputs are spent or evicted, and answers structured lookups with the
//! matching outpoints.
//!
//! ## Wire Format
//!
//! ```text
//! OP_FALSE OP_RETURN <push: protocol id> <push: UTF-8 JSON object> [<push>...]
//! ```
//!
//! Pushes use minimal pushdata encoding (direct, `OP_PUSHDATA1/2/4`). A host
//! may hand over scripts whose parser coalesced everything after
//! `OP_RETURN` into one chunk; the decoder re-parses that blob.
//!
//! ## Categories
//!
//! | Topic manager | Lookup service | Record |
//! |---------------|----------------|--------|
//! | `tm_agent_identity` | `ls_agent_identity` | [`IdentityRecord`] |
//! | `tm_agent_service` | `ls_agent_service` | [`ServiceRecord`] |
//!
//! ## Domain Invariants
//!
//! - Rows are keyed by outpoint; a re-admission overwrites the row.
//! - At most one live service row per `(identityKey, serviceId)`; the
//!   newest admission wins, enforced in one atomic batch.
//! - Lookups never return more than `max_results` outpoints.
//! - Malformed outputs are never admitted and never surface as errors.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): codec, payload validation, key layout, query predicates
//! - **Ports Layer** (`ports/`): host callbacks inbound, storage and time outbound
//! - **Service Layer** (`service/`): topic managers, catalog indexes, wiring
//! - **Adapters Layer** (`adapters/`): JSON API handler, RocksDB tables

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types for convenience
pub use domain::{
    AdmitOutcome, AdmittanceInstructions, AgentPayload, AgentQuery, CatalogConfig, CatalogEntry,
    CatalogError, ConfigError, DecodeError, IdentityRecord, KVStoreError, LockingScript,
    LookupQuery, LookupQuestion, Outpoint, PayloadValidator, Pricing, QueryError, RawOutput,
    RejectReason, ScriptChunk, ServiceMetadata, ServiceQuery, ServiceRecord, Topic, Txid,
    DEFAULT_MAX_RESULTS, PROTOCOL_ID,
};

pub use domain::codec::{decode, decode_bytes, encode};

pub use ports::{
    BatchOperation, InMemoryKVStore, KeyValueStore, LookupService, SystemTimeSource, TimeSource,
    TopicManager,
};

pub use service::{AgentTopicManager, CatalogIndex, CatalogMetrics, CatalogService};

pub use adapters::{handle_api_query, ApiGatewayHandler, ApiQueryError};
