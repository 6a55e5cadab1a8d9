//! # Inbound Ports (Driving Ports)
//!
//! Callbacks the hosting engine drives. The host verifies transactions,
//! asks each topic manager which outputs to admit, then reports admissions,
//! spends and evictions to the matching lookup service.

use crate::domain::{
    AdmitOutcome, AdmittanceInstructions, CatalogEntry, CatalogError, LookupQuery, Outpoint,
    RawOutput, ServiceMetadata, Topic,
};

/// Admission rule for one category.
///
/// Implementations are stateless: the answer depends only on the outputs.
pub trait TopicManager: Send + Sync {
    fn topic(&self) -> Topic;

    /// Indices of the outputs that qualify, ascending. Never rejects the
    /// whole transaction; `coins_to_retain` is always empty.
    fn identify_admissible_outputs(&self, outputs: &[RawOutput]) -> AdmittanceInstructions;

    /// Markdown description of the admission rules.
    fn documentation(&self) -> String;

    fn metadata(&self) -> ServiceMetadata;
}

/// UTXO-tracked index for one category.
pub trait LookupService: Send + Sync {
    fn topic(&self) -> Topic;

    /// Re-check and upsert the row for an admitted output.
    ///
    /// A payload that fails the re-check is a no-op reported as
    /// [`AdmitOutcome::Rejected`], not an error.
    fn output_admitted(&self, outpoint: Outpoint, script: &[u8])
        -> Result<AdmitOutcome, CatalogError>;

    /// Remove the row for a spent output. Returns whether a row was removed.
    fn output_spent(&self, outpoint: Outpoint) -> Result<bool, CatalogError>;

    /// Remove the row for an evicted output. Same effect as a spend.
    fn output_evicted(&self, outpoint: Outpoint) -> Result<bool, CatalogError>;

    /// Outpoints of matching rows, capped at the configured limit.
    fn lookup(&self, query: &LookupQuery) -> Result<Vec<Outpoint>, CatalogError>;

    /// Full stored row, for hosts resolving lookup answers.
    fn entry(&self, outpoint: &Outpoint) -> Result<Option<CatalogEntry>, CatalogError>;

    fn documentation(&self) -> String;

    fn metadata(&self) -> ServiceMetadata;
}
