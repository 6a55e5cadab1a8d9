//! # Payload Validator
//!
//! Schema check over the pushes recovered by the codec. Produces the
//! concrete record for the expected topic or the first reason it fails.
//!
//! Check order:
//! 1. Protocol tag push equals the configured identifier byte-for-byte
//! 2. Payload push parses as a JSON object
//! 3. `type` equals the topic's tag
//! 4. Topic-specific field checks

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::codec::{self, LockingScript};
use super::entities::{AgentPayload, IdentityRecord, Pricing, ServiceRecord};
use super::errors::{DecodeError, RejectReason};
use super::value_objects::{Topic, IDENTITY_KEY_HEX_LEN};

type Object = Map<String, Value>;

/// Validates catalog payloads against one protocol identifier.
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    protocol_id: String,
}

impl PayloadValidator {
    pub fn new(protocol_id: impl Into<String>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
        }
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Decode and validate a chunked script.
    pub fn check_script(
        &self,
        script: &LockingScript,
        topic: Topic,
    ) -> Result<AgentPayload, RejectReason> {
        let pushes = codec::decode(script)?;
        self.validate(&pushes, topic)
    }

    /// Decode and validate raw script bytes.
    pub fn check_bytes(&self, script: &[u8], topic: Topic) -> Result<AgentPayload, RejectReason> {
        let pushes = codec::decode_bytes(script)?;
        self.validate(&pushes, topic)
    }

    /// Validate decoded pushes. Pushes beyond the second are ignored.
    pub fn validate(&self, pushes: &[Vec<u8>], topic: Topic) -> Result<AgentPayload, RejectReason> {
        let (tag, body) = match pushes {
            [tag, body, ..] => (tag, body),
            _ => {
                return Err(DecodeError::TooFewPushes {
                    found: pushes.len(),
                }
                .into())
            }
        };

        if tag.as_slice() != self.protocol_id.as_bytes() {
            return Err(RejectReason::ProtocolMismatch);
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|e| RejectReason::MalformedJson {
                message: e.to_string(),
            })?;
        let Value::Object(object) = value else {
            return Err(RejectReason::NotAnObject);
        };

        let found = object.get("type").and_then(Value::as_str);
        if found != Some(topic.type_tag()) {
            return Err(RejectReason::TypeMismatch {
                expected: topic,
                found: found.map(str::to_string),
            });
        }

        match topic {
            Topic::Identity => validate_identity(&object).map(AgentPayload::Identity),
            Topic::Service => validate_service(&object).map(AgentPayload::Service),
        }
    }
}

fn validate_identity(object: &Object) -> Result<IdentityRecord, RejectReason> {
    Ok(IdentityRecord {
        identity_key: identity_key(object)?,
        name: non_empty_str(object, "name")?,
        description: required_str(object, "description")?.to_string(),
        channels: channels(object)?,
        capabilities: capabilities(object)?,
        timestamp: required_str(object, "timestamp")?.to_string(),
    })
}

fn validate_service(object: &Object) -> Result<ServiceRecord, RejectReason> {
    let identity_key = identity_key(object)?;
    let service_id = non_empty_str(object, "serviceId")?;
    let name = non_empty_str(object, "name")?;
    let description = required_str(object, "description")?.to_string();

    let pricing = match object.get("pricing") {
        None => return Err(RejectReason::MissingField { field: "pricing" }),
        Some(Value::Object(pricing)) => pricing,
        Some(_) => {
            return Err(RejectReason::WrongFieldType {
                field: "pricing",
                expected: "an object",
            })
        }
    };
    let model = match pricing.get("model") {
        None => return Err(RejectReason::MissingField { field: "pricing.model" }),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(RejectReason::EmptyField { field: "pricing.model" }),
        Some(_) => {
            return Err(RejectReason::WrongFieldType {
                field: "pricing.model",
                expected: "a string",
            })
        }
    };
    let amount_sats = match pricing.get("amountSats") {
        None => {
            return Err(RejectReason::MissingField {
                field: "pricing.amountSats",
            })
        }
        Some(value) => value.as_u64().ok_or(RejectReason::InvalidAmount)?,
    };

    Ok(ServiceRecord {
        identity_key,
        service_id,
        name,
        description,
        pricing: Pricing { model, amount_sats },
        timestamp: required_str(object, "timestamp")?.to_string(),
    })
}

fn required_str<'a>(object: &'a Object, field: &'static str) -> Result<&'a str, RejectReason> {
    match object.get(field) {
        None => Err(RejectReason::MissingField { field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RejectReason::WrongFieldType {
            field,
            expected: "a string",
        }),
    }
}

fn non_empty_str(object: &Object, field: &'static str) -> Result<String, RejectReason> {
    let s = required_str(object, field)?;
    if s.is_empty() {
        return Err(RejectReason::EmptyField { field });
    }
    Ok(s.to_string())
}

fn identity_key(object: &Object) -> Result<String, RejectReason> {
    let key = required_str(object, "identityKey")?;
    if !is_identity_key(key) {
        return Err(RejectReason::InvalidIdentityKey {
            length: key.chars().count(),
        });
    }
    Ok(key.to_string())
}

/// True for exactly 66 ASCII hex digits.
pub fn is_identity_key(key: &str) -> bool {
    key.len() == IDENTITY_KEY_HEX_LEN && key.bytes().all(|b| b.is_ascii_hexdigit())
}

fn channels(object: &Object) -> Result<BTreeMap<String, String>, RejectReason> {
    const EXPECTED: &str = "an object of string handles";
    let map = match object.get("channels") {
        None => return Err(RejectReason::MissingField { field: "channels" }),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(RejectReason::WrongFieldType {
                field: "channels",
                expected: EXPECTED,
            })
        }
    };
    map.iter()
        .map(|(name, handle)| match handle {
            Value::String(h) => Ok((name.clone(), h.clone())),
            _ => Err(RejectReason::WrongFieldType {
                field: "channels",
                expected: EXPECTED,
            }),
        })
        .collect()
}

fn capabilities(object: &Object) -> Result<Vec<String>, RejectReason> {
    const EXPECTED: &str = "an array of strings";
    let items = match object.get("capabilities") {
        None => return Err(RejectReason::MissingField { field: "capabilities" }),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(RejectReason::WrongFieldType {
                field: "capabilities",
                expected: EXPECTED,
            })
        }
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(RejectReason::WrongFieldType {
                    field: "capabilities",
                    expected: EXPECTED,
                })
        })
        .collect()
}
