//! # API Gateway Handler
//!
//! Transport-agnostic JSON method dispatcher over a [`CatalogService`].
//!
//! ```text
//! Host / gateway → handle_api_query(method, params) → CatalogService
//! ```
//!
//! Errors use JSON-RPC codes: `-32601` unknown method, `-32602` bad
//! params, `-32603` storage failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{CatalogEntry, LookupQuestion, Outpoint, QueryError, Topic, Txid};
use crate::ports::KeyValueStore;
use crate::service::CatalogService;

/// Error from API query handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiQueryError {
    pub code: i32,
    pub message: String,
}

impl ApiQueryError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
        }
    }

    pub fn invalid_params(msg: &str) -> Self {
        Self {
            code: -32602,
            message: msg.to_string(),
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            code: -32603,
            message: msg.to_string(),
        }
    }
}

impl std::fmt::Display for ApiQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiQueryError {}

impl From<QueryError> for ApiQueryError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Catalog(inner) => {
                warn!("[catalog] lookup failed: {}", inner);
                ApiQueryError::internal(&inner.to_string())
            }
            other => ApiQueryError::invalid_params(&other.to_string()),
        }
    }
}

/// One lookup answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutpointResponse {
    pub txid: String,
    pub output_index: u32,
}

impl From<Outpoint> for OutpointResponse {
    fn from(outpoint: Outpoint) -> Self {
        Self {
            txid: outpoint.txid.to_string(),
            output_index: outpoint.output_index,
        }
    }
}

/// Response for a stored row lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub found: bool,
    /// Payload JSON as published, including `protocol` and `type`.
    pub record: Option<Value>,
    pub indexed_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryParams {
    topic: String,
    txid: String,
    output_index: u32,
}

/// API Gateway handler for the agent catalog.
pub struct ApiGatewayHandler<S: KeyValueStore> {
    service: Arc<CatalogService<S>>,
}

impl<S: KeyValueStore> ApiGatewayHandler<S> {
    pub fn new(service: Arc<CatalogService<S>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<CatalogService<S>> {
        &self.service
    }

    /// Handle lookup request: `{ "service": "ls_agent_…", "query": { … } }`.
    pub fn handle_lookup(&self, params: &Value) -> Result<Value, ApiQueryError> {
        let question: LookupQuestion = serde_json::from_value(params.clone())
            .map_err(|e| ApiQueryError::invalid_params(&e.to_string()))?;
        let answers: Vec<OutpointResponse> = self
            .service
            .lookup_question(&question)?
            .into_iter()
            .map(OutpointResponse::from)
            .collect();
        Ok(json!({ "outpoints": answers }))
    }

    /// Handle get_entry request: `{ "topic", "txid", "outputIndex" }`.
    ///
    /// `topic` accepts a topic manager or lookup service name.
    pub fn handle_get_entry(&self, params: &Value) -> Result<Value, ApiQueryError> {
        let params: EntryParams = serde_json::from_value(params.clone())
            .map_err(|e| ApiQueryError::invalid_params(&e.to_string()))?;
        let topic = Topic::from_topic_name(&params.topic)
            .or_else(|| Topic::from_lookup_service_name(&params.topic))
            .ok_or_else(|| {
                ApiQueryError::invalid_params(&format!("Unknown topic: {}", params.topic))
            })?;
        let txid: Txid = params
            .txid
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| ApiQueryError::invalid_params("Invalid txid"))?;

        let entry = self
            .service
            .entry(topic, &Outpoint::new(txid, params.output_index))
            .map_err(|e| ApiQueryError::internal(&e.to_string()))?;
        let response = self.entry_response(entry);
        serde_json::to_value(response).map_err(|e| ApiQueryError::internal(&e.to_string()))
    }

    fn entry_response(&self, entry: Option<CatalogEntry>) -> EntryResponse {
        match entry {
            Some(entry) => EntryResponse {
                found: true,
                record: Some(
                    entry
                        .payload
                        .to_wire_value(&self.service.config().protocol_id),
                ),
                indexed_at: Some(entry.indexed_at),
            },
            None => EntryResponse {
                found: false,
                record: None,
                indexed_at: None,
            },
        }
    }

    /// Handle get_metrics request.
    pub fn handle_get_metrics(&self) -> Result<Value, ApiQueryError> {
        let catalogs = self
            .service
            .metrics()
            .map_err(|e| ApiQueryError::internal(&e.to_string()))?;
        Ok(json!({ "catalogs": catalogs }))
    }

    /// Handle list_topics request.
    pub fn handle_list_topics(&self) -> Value {
        let (managers, lookups): (Vec<_>, Vec<_>) = self
            .service
            .list_topics()
            .into_iter()
            .partition(|meta| meta.name.starts_with("tm_"));
        json!({
            "topicManagers": managers,
            "lookupServices": lookups,
        })
    }
}

/// Handle an API query.
///
/// ## Supported Methods
///
/// - `lookup`: run a lookup question
/// - `get_entry`: fetch a stored row by outpoint
/// - `get_metrics`: per-catalog counters
/// - `list_topics`: topic manager and lookup service descriptors
pub fn handle_api_query<S: KeyValueStore>(
    handler: &ApiGatewayHandler<S>,
    method: &str,
    params: &Value,
) -> Result<Value, ApiQueryError> {
    match method {
        "lookup" => handler.handle_lookup(params),
        "get_entry" => handler.handle_get_entry(params),
        "get_metrics" => handler.handle_get_metrics(),
        "list_topics" => Ok(handler.handle_list_topics()),
        _ => Err(ApiQueryError::method_not_found(method)),
    }
}
