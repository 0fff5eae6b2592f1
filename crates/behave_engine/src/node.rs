// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node runtime base shared by every node kind.

use crate::context::{GraphContext, NodeContext};
use crate::error::{LoadError, Result, RuntimeError};
use crate::events::{CustomEvent, Selection};
use crate::graph::{Flow, NodeDefinition, ValueSource};
use crate::value::{coerce_literal, Value};
use indexmap::IndexMap;

/// Output values of a node, by socket
pub type Outputs = IndexMap<String, Value>;

/// Outputs holding a single socket
pub fn single_output(socket: &str, value: Value) -> Outputs {
    let mut outputs = Outputs::new();
    outputs.insert(socket.to_string(), value);
    outputs
}

/// Host ingress a graph's nodes asked for while loading
#[derive(Debug, Default)]
pub struct Subscriptions {
    /// `(event name, node index)`
    pub events: Vec<(String, usize)>,
    /// `(scene node, node index)`
    pub selections: Vec<(usize, usize)>,
}

/// Everything a node kind needs to build an instance
pub struct NodeInit<'a> {
    /// Position of the node in the graph
    pub index: usize,
    /// Declarative description
    pub definition: &'a NodeDefinition,
    /// State of the graph being loaded
    pub graph: &'a GraphContext,
    subscriptions: &'a mut Subscriptions,
}

impl<'a> NodeInit<'a> {
    /// Create an init record; subscriptions requested by the node are
    /// appended to `subscriptions`
    pub fn new(
        index: usize,
        definition: &'a NodeDefinition,
        graph: &'a GraphContext,
        subscriptions: &'a mut Subscriptions,
    ) -> Self {
        Self {
            index,
            definition,
            graph,
            subscriptions,
        }
    }

    /// Build the shared base for this node
    pub fn base(&self, name: &str) -> NodeBase {
        NodeBase::new(name, self.index, self.definition)
    }

    /// Have this node receive events named `event` once the graph loads
    pub fn subscribe(&mut self, event: impl Into<String>) {
        self.subscriptions.events.push((event.into(), self.index));
    }

    /// Have this node receive selections of a scene node
    pub fn subscribe_selection(&mut self, scene_node: usize) {
        self.subscriptions.selections.push((scene_node, self.index));
    }
}

/// State and helpers common to all nodes
#[derive(Debug, Clone)]
pub struct NodeBase {
    name: String,
    index: usize,
    kind: String,
    flows: IndexMap<String, Flow>,
    values: IndexMap<String, ValueSource>,
    configuration: IndexMap<String, serde_json::Value>,
    published: Outputs,
    pulled: Option<(u64, Outputs)>,
}

impl NodeBase {
    /// Create a base from a node definition
    pub fn new(name: impl Into<String>, index: usize, definition: &NodeDefinition) -> Self {
        Self {
            name: name.into(),
            index,
            kind: definition.kind.clone(),
            flows: definition
                .flows
                .iter()
                .map(|f| (f.id.clone(), f.clone()))
                .collect(),
            values: definition
                .values
                .iter()
                .map(|v| (v.id.clone(), v.source.clone()))
                .collect(),
            configuration: definition
                .configuration
                .iter()
                .map(|c| (c.id.clone(), c.value.clone()))
                .collect(),
            published: Outputs::new(),
            pulled: None,
        }
    }

    /// Display name used in errors and logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the graph
    pub fn index(&self) -> usize {
        self.index
    }

    /// Registered kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Declared flow by id
    pub fn flow(&self, id: &str) -> Option<&Flow> {
        self.flows.get(id)
    }

    /// Declared value ids, in declaration order
    pub fn value_ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether a value socket is declared
    pub fn has_value(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Source of a declared value
    pub fn value_source(&self, id: &str) -> Option<&ValueSource> {
        self.values.get(id)
    }

    /// Configuration entry; `null` counts as absent
    pub fn configuration(&self, id: &str) -> Option<&serde_json::Value> {
        self.configuration.get(id).filter(|v| !v.is_null())
    }

    /// Fail unless every listed value is declared
    pub fn require_values(&self, ids: &[&str]) -> std::result::Result<(), LoadError> {
        match ids.iter().find(|id| !self.values.contains_key(**id)) {
            Some(id) => Err(LoadError::MissingValue {
                node: self.name.clone(),
                id: (*id).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Fail unless every listed flow is declared
    pub fn require_flows(&self, ids: &[&str]) -> std::result::Result<(), LoadError> {
        match ids.iter().find(|id| !self.flows.contains_key(**id)) {
            Some(id) => Err(LoadError::MissingFlow {
                node: self.name.clone(),
                id: (*id).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Configuration entry that must be present
    pub fn require_configuration(&self, id: &str) -> std::result::Result<&serde_json::Value, LoadError> {
        self.configuration(id)
            .ok_or_else(|| LoadError::MissingConfiguration {
                node: self.name.clone(),
                id: id.to_string(),
            })
    }

    /// Fill in a configuration entry that was left out
    pub fn default_configuration(&mut self, id: &str, value: serde_json::Value) {
        if self.configuration(id).is_none() {
            self.configuration.insert(id.to_string(), value);
        }
    }

    /// Configuration entry that must be a non-negative integer
    pub fn configuration_index(&self, id: &str) -> std::result::Result<usize, LoadError> {
        self.require_configuration(id)?
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| self.invalid_configuration(id, "expected a non-negative integer"))
    }

    /// Configuration entry that must be a string
    pub fn configuration_str(&self, id: &str) -> std::result::Result<&str, LoadError> {
        self.require_configuration(id)?
            .as_str()
            .ok_or_else(|| self.invalid_configuration(id, "expected a string"))
    }

    /// Build an invalid-configuration error for this node
    pub fn invalid_configuration(&self, id: &str, reason: impl Into<String>) -> LoadError {
        LoadError::InvalidConfiguration {
            node: self.name.clone(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Resolve a declared value: literals are coerced through the type
    /// table, references are pulled from their producer
    pub fn evaluate(&self, id: &str, cx: &mut NodeContext<'_>) -> Result<Value> {
        let source = self.values.get(id).ok_or_else(|| RuntimeError::UnknownValue {
            node: self.name.clone(),
            id: id.to_string(),
        })?;
        match source {
            ValueSource::Literal { value, type_index } => {
                let type_name = cx.graph().types.type_name(*type_index)?;
                coerce_literal(type_name, value)
            }
            ValueSource::Reference { node, socket } => cx.pull(*node, socket),
        }
    }

    /// Resolve every declared value, in declaration order
    pub fn evaluate_all(&self, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        let mut resolved = Outputs::new();
        for id in self.values.keys() {
            resolved.insert(id.clone(), self.evaluate(id, cx)?);
        }
        Ok(resolved)
    }

    /// Continue a declared flow synchronously. Returns `false` when the flow
    /// is not declared or has no target.
    pub fn continue_flow(&self, id: &str, cx: &mut NodeContext<'_>) -> bool {
        match self.flows.get(id) {
            Some(flow) => cx.continue_flow(flow),
            None => false,
        }
    }

    /// Append a declared flow to the work queue
    pub fn enqueue_flow(&self, id: &str, cx: &mut NodeContext<'_>) -> bool {
        match self.flows.get(id) {
            Some(flow) => cx.enqueue(flow),
            None => false,
        }
    }

    /// Set an output that persists until overwritten
    pub fn publish(&mut self, socket: impl Into<String>, value: Value) {
        self.published.insert(socket.into(), value);
    }

    /// Outputs set with [`NodeBase::publish`]
    pub fn published(&self) -> &Outputs {
        &self.published
    }

    /// Output available without processing: published values first, then
    /// results pulled during the current cache epoch
    pub fn cached_output(&self, socket: &str, epoch: u64) -> Option<&Value> {
        self.published.get(socket).or_else(|| match &self.pulled {
            Some((pulled_epoch, outputs)) if *pulled_epoch == epoch => outputs.get(socket),
            _ => None,
        })
    }

    /// Record the results of a pull made during `epoch`
    pub fn remember_pulled(&mut self, epoch: u64, outputs: Outputs) {
        self.pulled = Some((epoch, outputs));
    }
}

/// A node instance in a loaded graph
pub trait BehaviorNode {
    /// Shared state
    fn base(&self) -> &NodeBase;

    /// Shared state, mutably
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Process the node.
    ///
    /// `socket` is the entry socket when reached through a flow and `None`
    /// when a consumer pulls the node's outputs. The default continues the
    /// `out` flow.
    fn process(&mut self, socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        let _ = socket;
        self.base().continue_flow("out", cx);
        Ok(Outputs::new())
    }

    /// Handle a custom event the node subscribed to at load
    fn on_custom_event(&mut self, event: &CustomEvent, cx: &mut NodeContext<'_>) -> Result<()> {
        let _ = (event, cx);
        Ok(())
    }

    /// Handle a selection of the scene node it subscribed to. Returns
    /// whether the selection should propagate to the scene node's parent.
    fn on_select(&mut self, selection: &Selection, cx: &mut NodeContext<'_>) -> Result<bool> {
        let _ = (selection, cx);
        Ok(true)
    }
}

/// A node kind with a well-known name
pub trait NodeKind: BehaviorNode + Sized + 'static {
    /// Registered kind name
    const KIND: &'static str;

    /// Build an instance, validating its declaration
    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError>;
}
