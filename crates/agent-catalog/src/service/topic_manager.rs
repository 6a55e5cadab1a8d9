//! # Topic Managers
//!
//! One manager per category. Each output is decoded and validated on its
//! own; the admitted set is the ascending list of indices that pass.

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{
    AdmittanceInstructions, AgentPayload, CatalogConfig, PayloadValidator, RawOutput,
    RejectReason, ServiceMetadata, Topic,
};
use crate::ports::TopicManager;

/// Admission rule for agent identity or service payloads.
#[derive(Debug, Clone)]
pub struct AgentTopicManager {
    topic: Topic,
    validator: PayloadValidator,
    parallel_threshold: usize,
}

impl AgentTopicManager {
    pub fn new(topic: Topic, config: &CatalogConfig) -> Self {
        Self {
            topic,
            validator: PayloadValidator::new(config.protocol_id.clone()),
            parallel_threshold: config.parallel_threshold,
        }
    }

    pub fn identity(config: &CatalogConfig) -> Self {
        Self::new(Topic::Identity, config)
    }

    pub fn service(config: &CatalogConfig) -> Self {
        Self::new(Topic::Service, config)
    }

    /// Decode and validate one output for this topic.
    pub fn check(&self, output: &RawOutput) -> Result<AgentPayload, RejectReason> {
        self.validator.check_bytes(&output.script, self.topic)
    }

    fn admitted_index(&self, output: &RawOutput) -> Option<u32> {
        match self.check(output) {
            Ok(_) => Some(output.output_index),
            Err(reason) => {
                debug!(
                    "[catalog] {} output {} not admitted: {}",
                    self.topic.topic_name(),
                    output.output_index,
                    reason
                );
                None
            }
        }
    }
}

impl TopicManager for AgentTopicManager {
    fn topic(&self) -> Topic {
        self.topic
    }

    fn identify_admissible_outputs(&self, outputs: &[RawOutput]) -> AdmittanceInstructions {
        let mut admitted: Vec<u32> = if outputs.len() >= self.parallel_threshold {
            outputs
                .par_iter()
                .filter_map(|o| self.admitted_index(o))
                .collect()
        } else {
            outputs.iter().filter_map(|o| self.admitted_index(o)).collect()
        };
        admitted.sort_unstable();
        admitted.dedup();

        AdmittanceInstructions {
            outputs_to_admit: admitted,
            coins_to_retain: Vec::new(),
        }
    }

    fn documentation(&self) -> String {
        match self.topic {
            Topic::Identity => format!(
                "# Agent identity topic\n\n\
                 Admits outputs whose script is `OP_FALSE OP_RETURN <\"{}\"> <json>` where the \
                 JSON object has `type: \"identity\"`, a 66-hex-character `identityKey`, a \
                 non-empty `name`, a string `description`, a `channels` object of string \
                 handles, a `capabilities` array of strings and a string `timestamp`.",
                self.validator.protocol_id()
            ),
            Topic::Service => format!(
                "# Agent service topic\n\n\
                 Admits outputs whose script is `OP_FALSE OP_RETURN <\"{}\"> <json>` where the \
                 JSON object has `type: \"service\"`, a 66-hex-character `identityKey`, \
                 non-empty `serviceId` and `name`, a string `description`, `pricing` with a \
                 non-empty `model` and a non-negative integer `amountSats`, and a string \
                 `timestamp`.",
                self.validator.protocol_id()
            ),
        }
    }

    fn metadata(&self) -> ServiceMetadata {
        let short_description = match self.topic {
            Topic::Identity => "Agent identity records",
            Topic::Service => "Agent service offers",
        };
        ServiceMetadata {
            name: self.topic.topic_name().to_string(),
            short_description: short_description.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codec::{encode_pushes, push_data};
    use crate::domain::value_objects::PROTOCOL_ID;
    use serde_json::json;

    fn identity_script(name: &str) -> Vec<u8> {
        let body = json!({
            "type": "identity",
            "identityKey": "03".to_string() + &"7e".repeat(32),
            "name": name,
            "description": "",
            "channels": {},
            "capabilities": [],
            "timestamp": "2026-02-02T00:00:00Z"
        })
        .to_string();
        encode_pushes([PROTOCOL_ID.as_bytes(), body.as_bytes()])
    }

    #[test]
    fn test_admits_valid_outputs_in_ascending_order() {
        let manager = AgentTopicManager::identity(&CatalogConfig::default());
        let outputs = vec![
            RawOutput::new(2, identity_script("c")),
            RawOutput::new(1, vec![0x76, 0xa9, 0x14]),
            RawOutput::new(0, identity_script("a")),
        ];

        let result = manager.identify_admissible_outputs(&outputs);
        assert_eq!(result.outputs_to_admit, vec![0, 2]);
        assert!(result.coins_to_retain.is_empty());
    }

    #[test]
    fn test_service_manager_ignores_identity_payloads() {
        let manager = AgentTopicManager::service(&CatalogConfig::default());
        let outputs = vec![RawOutput::new(0, identity_script("a"))];
        assert!(manager
            .identify_admissible_outputs(&outputs)
            .outputs_to_admit
            .is_empty());
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        let config = CatalogConfig {
            parallel_threshold: 4,
            ..Default::default()
        };
        let manager = AgentTopicManager::identity(&config);
        let outputs: Vec<RawOutput> = (0..40u32)
            .map(|i| {
                if i % 3 == 0 {
                    RawOutput::new(i, identity_script("p"))
                } else {
                    let mut junk = vec![0x00, 0x6a];
                    push_data(&mut junk, b"x");
                    RawOutput::new(i, junk)
                }
            })
            .collect();

        let expected: Vec<u32> = (0..40).filter(|i| i % 3 == 0).collect();
        assert_eq!(
            manager.identify_admissible_outputs(&outputs).outputs_to_admit,
            expected
        );
    }

    #[test]
    fn test_metadata_names_topic() {
        let manager = AgentTopicManager::service(&CatalogConfig::default());
        assert_eq!(manager.metadata().name, "tm_agent_service");
        assert!(manager.documentation().contains("amountSats"));
    }
}
