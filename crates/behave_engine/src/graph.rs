// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph payload: the declarative description a host hands to the engine.
//!
//! A node's position in `nodes` is its only identity. Value references may
//! only point backwards, which keeps pull evaluation acyclic without a
//! general cycle check.

use crate::error::LoadError;
use crate::types::TypeDefinition;
use serde::{Deserialize, Serialize};

/// Complete behavior graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPayload {
    /// Nodes, addressed by index
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    /// Graph-wide variables
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    /// Custom events the graph can send or receive
    #[serde(default)]
    pub custom_events: Vec<CustomEventDescriptor>,
    /// Type table referenced by literals, variables and event schemas
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl GraphPayload {
    /// Parse a payload from JSON
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject any value that references its own node or a later one
    pub fn validate(&self) -> Result<(), LoadError> {
        for (index, node) in self.nodes.iter().enumerate() {
            for value in &node.values {
                if let ValueSource::Reference { node: target, .. } = value.source {
                    if target >= index {
                        return Err(LoadError::ForwardReference { index, target });
                    }
                }
            }
        }
        Ok(())
    }

    /// Index of the first node of the given kind
    pub fn find_kind(&self, kind: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.kind == kind)
    }
}

/// Immutable description of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Registered node kind
    #[serde(rename = "type")]
    pub kind: String,
    /// Outgoing control edges
    #[serde(default)]
    pub flows: Vec<Flow>,
    /// Input data edges
    #[serde(default)]
    pub values: Vec<ValueDefinition>,
    /// Static configuration
    #[serde(default)]
    pub configuration: Vec<ConfigurationEntry>,
}

impl NodeDefinition {
    /// Create a node of the given kind with no sockets
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            flows: Vec::new(),
            values: Vec::new(),
            configuration: Vec::new(),
        }
    }

    /// Add a flow to another node
    pub fn with_flow(mut self, id: impl Into<String>, node: usize) -> Self {
        self.flows.push(Flow::to(id, node));
        self
    }

    /// Add a literal value
    pub fn with_literal(
        mut self,
        id: impl Into<String>,
        type_index: usize,
        value: serde_json::Value,
    ) -> Self {
        self.values.push(ValueDefinition {
            id: id.into(),
            source: ValueSource::Literal { value, type_index },
        });
        self
    }

    /// Add a value pulled from another node's output socket
    pub fn with_reference(
        mut self,
        id: impl Into<String>,
        node: usize,
        socket: impl Into<String>,
    ) -> Self {
        self.values.push(ValueDefinition {
            id: id.into(),
            source: ValueSource::Reference {
                node,
                socket: socket.into(),
            },
        });
        self
    }

    /// Add a configuration entry
    pub fn with_configuration(mut self, id: impl Into<String>, value: serde_json::Value) -> Self {
        self.configuration.push(ConfigurationEntry {
            id: id.into(),
            value,
        });
        self
    }
}

/// Control edge. A flow without a target node has no continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// Output socket name on the owning node
    pub id: String,
    /// Target node index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<usize>,
    /// Entry socket on the target node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
}

impl Flow {
    /// Create a flow into a node's default entry
    pub fn to(id: impl Into<String>, node: usize) -> Self {
        Self {
            id: id.into(),
            node: Some(node),
            socket: None,
        }
    }

    /// Set the entry socket
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }
}

/// Input data edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDefinition {
    /// Input socket name
    pub id: String,
    /// Where the value comes from
    #[serde(flatten)]
    pub source: ValueSource,
}

/// Origin of an input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    /// Inline literal, coerced through the type table
    Literal {
        /// Raw literal
        value: serde_json::Value,
        /// Index into the type table
        #[serde(rename = "type")]
        type_index: usize,
    },
    /// Output socket of an earlier node
    Reference {
        /// Producer node index
        node: usize,
        /// Producer output socket
        socket: String,
    },
}

/// Static configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    /// Configuration id
    pub id: String,
    /// Raw configuration value
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Declared graph variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    /// Variable id
    pub id: String,
    /// Index into the type table
    #[serde(rename = "type")]
    pub type_index: usize,
    /// Current value at load time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Value the variable starts from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<serde_json::Value>,
}

/// Named host-visible event and its parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEventDescriptor {
    /// Event id
    pub id: String,
    /// Parameter schema
    #[serde(default)]
    pub values: Vec<EventParameter>,
}

impl CustomEventDescriptor {
    /// Schema entry for a parameter
    pub fn parameter(&self, id: &str) -> Option<&EventParameter> {
        self.values.iter().find(|p| p.id == id)
    }
}

/// One typed parameter of a custom event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParameter {
    /// Parameter id
    pub id: String,
    /// Index into the type table
    #[serde(rename = "type")]
    pub type_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_parsing() {
        let payload = GraphPayload::from_json(
            &json!({
                "nodes": [
                    {"type": "lifecycle/onStart", "flows": [{"id": "out", "node": 1}]},
                    {
                        "type": "math/add",
                        "values": [
                            {"id": "a", "value": 1, "type": 0},
                            {"id": "b", "node": 0, "socket": "val"}
                        ]
                    }
                ],
                "types": [{"signature": "int"}]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.nodes[0].flows[0], Flow::to("out", 1));
        assert_eq!(
            payload.nodes[1].values[0].source,
            ValueSource::Literal {
                value: json!(1),
                type_index: 0
            }
        );
        assert_eq!(
            payload.nodes[1].values[1].source,
            ValueSource::Reference {
                node: 0,
                socket: "val".to_string()
            }
        );
        assert_eq!(payload.find_kind("math/add"), Some(1));
    }

    #[test]
    fn test_backward_references_validate() {
        let mut payload = GraphPayload::default();
        for index in 0..6 {
            let mut node = NodeDefinition::new("math/add");
            for target in 0..index {
                node = node.with_reference(format!("v{target}"), target, "val");
            }
            payload.nodes.push(node);
        }
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_forward_and_self_references_rejected() {
        let mut payload = GraphPayload::default();
        payload.nodes.push(NodeDefinition::new("math/add"));
        payload
            .nodes
            .push(NodeDefinition::new("math/add").with_reference("a", 1, "val"));
        assert!(matches!(
            payload.validate(),
            Err(LoadError::ForwardReference { index: 1, target: 1 })
        ));

        payload.nodes[1] = NodeDefinition::new("math/add").with_reference("a", 5, "val");
        assert!(matches!(
            payload.validate(),
            Err(LoadError::ForwardReference { index: 1, target: 5 })
        ));
    }
}
