//! # Domain Errors
//!
//! Error types for the agent catalog.
//!
//! ## Design Principles
//!
//! - Decode and schema failures are values (`RejectReason`), never surfaced
//!   to the host as operation failures
//! - Storage failures propagate unchanged as `CatalogError`
//! - No panics in domain logic (use Result instead)

use thiserror::Error;

use super::value_objects::Topic;

/// Script-level decode failures: the output is not a catalog script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Script does not start with `OP_FALSE OP_RETURN`.
    #[error("script does not start with the OP_FALSE OP_RETURN prefix")]
    MissingPrefix,

    /// Fewer than the two required pushes (protocol tag, payload) were recovered.
    #[error("expected at least 2 data pushes, found {found}")]
    TooFewPushes { found: usize },
}

/// Machine-readable reason a payload was refused admission.
///
/// Validation is all-or-nothing: any reason means no record was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("not applicable: {0}")]
    NotApplicable(#[from] DecodeError),

    #[error("protocol tag does not match the catalog protocol identifier")]
    ProtocolMismatch,

    #[error("payload is not valid JSON: {message}")]
    MalformedJson { message: String },

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload type {found:?} does not match topic {expected}")]
    TypeMismatch {
        expected: Topic,
        found: Option<String>,
    },

    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be {expected}")]
    WrongFieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` must not be empty")]
    EmptyField { field: &'static str },

    #[error("identityKey must be 66 hex characters (got {length} chars)")]
    InvalidIdentityKey { length: usize },

    #[error("pricing.amountSats must be a non-negative integer")]
    InvalidAmount,
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
    /// Named table (column family) is not present.
    #[error("KV store table not found: {name}")]
    MissingTable { name: String },
}

/// Errors surfaced to the host from catalog callbacks and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Storage(#[from] KVStoreError),

    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// A stored key does not have the layout this catalog writes.
    #[error("corrupt catalog key: {message}")]
    CorruptKey { message: String },

    /// Index was asked to serve a topic it does not own.
    #[error("catalog for {expected} cannot serve {actual} requests")]
    TopicMismatch { expected: Topic, actual: Topic },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<bincode::Error> for CatalogError {
    fn from(err: bincode::Error) -> Self {
        CatalogError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Errors parsing a lookup question from the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown lookup service: {0}")]
    UnknownService(String),

    #[error("invalid query for {service}: {message}")]
    InvalidQuery { service: String, message: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("protocol identifier must not be empty")]
    EmptyProtocolId,

    #[error("max_results must be greater than zero")]
    ZeroResultLimit,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
