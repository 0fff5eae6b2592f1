// SPDX-License-Identifier: MIT OR Apache-2.0
//! State shared by the nodes of a loaded graph and the context handed to a
//! node while it processes.

use crate::animation::{AnimationParameters, AnimationTask, Animations, Completion};
use crate::error::{LoadError, Result, RuntimeError};
use crate::events::{CustomEvent, EventPayload};
use crate::graph::{CustomEventDescriptor, Flow, GraphPayload};
use crate::node::BehaviorNode;
use crate::pointer::PathRegistry;
use crate::types::TypeTable;
use crate::value::{coerce_literal, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Storage slot of one node instance
pub type NodeSlot = RefCell<Box<dyn BehaviorNode>>;

/// A graph variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable id
    pub id: String,
    /// Current value
    pub value: Value,
    /// Value at load time
    pub initial_value: Value,
}

/// Memo of pulled values, valid until the next clear.
///
/// Clearing bumps the epoch so per-node pulled results from before the
/// clear are recognized as stale.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    epoch: u64,
    entries: HashMap<(usize, String), Value>,
}

impl EvaluationCache {
    /// Current epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Cached value of a producer's output socket
    pub fn get(&self, node: usize, socket: &str) -> Option<&Value> {
        self.entries.get(&(node, socket.to_string()))
    }

    /// Cache a producer's output socket
    pub fn insert(&mut self, node: usize, socket: impl Into<String>, value: Value) {
        self.entries.insert((node, socket.into()), value);
    }

    /// Drop every entry and start a new epoch
    pub fn clear(&mut self) {
        self.entries.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-graph state every node of the graph can see
#[derive(Debug, Default)]
pub struct GraphContext {
    /// Type table
    pub types: TypeTable,
    /// Variables, by declaration index
    pub variables: Vec<Variable>,
    /// Custom event descriptors, by declaration index
    pub custom_events: Vec<CustomEventDescriptor>,
    /// Per-step evaluation cache
    pub cache: EvaluationCache,
    /// Prefix applied to custom event names
    pub event_prefix: String,
}

impl GraphContext {
    /// Build the context of a payload, coercing variable values
    pub fn from_payload(
        payload: &GraphPayload,
        event_prefix: impl Into<String>,
    ) -> std::result::Result<Self, LoadError> {
        let types = TypeTable::new(payload.types.clone());
        let mut variables = Vec::with_capacity(payload.variables.len());
        for definition in &payload.variables {
            let invalid = |source| LoadError::InvalidVariable {
                id: definition.id.clone(),
                source,
            };
            let type_name = types.type_name(definition.type_index).map_err(invalid)?;
            let raw_initial = definition
                .initial_value
                .as_ref()
                .or(definition.value.as_ref())
                .cloned()
                .unwrap_or_default();
            let raw_value = definition
                .value
                .as_ref()
                .or(definition.initial_value.as_ref())
                .cloned()
                .unwrap_or_default();
            variables.push(Variable {
                id: definition.id.clone(),
                value: coerce_literal(type_name, &raw_value).map_err(invalid)?,
                initial_value: coerce_literal(type_name, &raw_initial).map_err(invalid)?,
            });
        }

        Ok(Self {
            types,
            variables,
            custom_events: payload.custom_events.clone(),
            cache: EvaluationCache::default(),
            event_prefix: event_prefix.into(),
        })
    }

    /// Bus name of a custom event id
    pub fn event_name(&self, id: &str) -> String {
        format!("{}{}", self.event_prefix, id)
    }

    /// Variable by id
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }
}

/// A pending unit of control flow: process `node` entered at `socket`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Node index
    pub node: usize,
    /// Entry socket
    pub socket: Option<String>,
}

impl WorkItem {
    /// Work item continuing a flow, if the flow has a target
    pub fn from_flow(flow: &Flow) -> Option<Self> {
        flow.node.map(|node| Self {
            node,
            socket: flow.socket.clone(),
        })
    }
}

/// Engine time bookkeeping
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock {
    /// Current engine time
    pub now: Duration,
    /// Time the current graph was loaded
    pub graph_started: Duration,
    /// Time the last tick fired
    pub last_tick: Option<Duration>,
}

/// Engine-wide mutable state nodes may touch while processing
#[derive(Debug, Default)]
pub struct Runtime {
    /// Host property bindings
    pub paths: PathRegistry,
    /// Running animations
    pub animations: Animations,
    /// FIFO of pending work
    pub queue: VecDeque<WorkItem>,
    /// Flows a node continued synchronously, in order
    pub continuations: Vec<Flow>,
    /// Events emitted during processing, dispatched after the node returns
    pub outbox: Vec<CustomEvent>,
    /// Engine time
    pub clock: Clock,
}

/// View of the engine handed to a node while it processes
pub struct NodeContext<'a> {
    nodes: &'a [NodeSlot],
    graph: &'a mut GraphContext,
    runtime: &'a mut Runtime,
}

impl<'a> NodeContext<'a> {
    /// Create a context over the engine's nodes and state
    pub fn new(nodes: &'a [NodeSlot], graph: &'a mut GraphContext, runtime: &'a mut Runtime) -> Self {
        Self {
            nodes,
            graph,
            runtime,
        }
    }

    /// Graph state
    pub fn graph(&self) -> &GraphContext {
        self.graph
    }

    /// Engine time
    pub fn now(&self) -> Duration {
        self.runtime.clock.now
    }

    /// Engine time when the current graph was loaded
    pub fn graph_started(&self) -> Duration {
        self.runtime.clock.graph_started
    }

    /// Pull a producer's output socket, memoized in the per-step cache
    pub fn pull(&mut self, producer: usize, socket: &str) -> Result<Value> {
        if let Some(value) = self.graph.cache.get(producer, socket) {
            return Ok(value.clone());
        }

        let nodes = self.nodes;
        let slot = nodes.get(producer).ok_or(RuntimeError::UnknownNode(producer))?;
        let mut node = slot
            .try_borrow_mut()
            .map_err(|_| RuntimeError::ReentrantEvaluation(producer))?;

        let epoch = self.graph.cache.epoch();
        let cached = node.base().cached_output(socket, epoch).cloned();
        let value = match cached {
            Some(value) => value,
            None => {
                tracing::trace!("Evaluating node {} for {}", producer, socket);
                let outputs = node.process(None, self)?;
                let value = outputs
                    .get(socket)
                    .cloned()
                    .ok_or_else(|| RuntimeError::MissingOutput {
                        node: producer,
                        socket: socket.to_string(),
                    })?;
                node.base_mut().remember_pulled(self.graph.cache.epoch(), outputs);
                value
            }
        };

        self.graph.cache.insert(producer, socket, value.clone());
        Ok(value)
    }

    /// Forget every pulled value so later pulls re-evaluate
    pub fn clear_evaluation_cache(&mut self) {
        self.graph.cache.clear();
    }

    /// Variable by declaration index
    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.graph.variables.get(index)
    }

    /// Overwrite a variable's current value
    pub fn set_variable(&mut self, index: usize, value: Value) -> bool {
        match self.graph.variables.get_mut(index) {
            Some(variable) => {
                variable.value = value;
                true
            }
            None => false,
        }
    }

    /// Custom event descriptor by declaration index
    pub fn custom_event(&self, index: usize) -> Option<&CustomEventDescriptor> {
        self.graph.custom_events.get(index)
    }

    /// Continue a flow synchronously, after the current node returns and
    /// before the next queued item
    pub fn continue_flow(&mut self, flow: &Flow) -> bool {
        if flow.node.is_none() {
            return false;
        }
        self.runtime.continuations.push(flow.clone());
        true
    }

    /// Append a flow to the back of the work queue
    pub fn enqueue(&mut self, flow: &Flow) -> bool {
        match WorkItem::from_flow(flow) {
            Some(item) if item.node < self.nodes.len() => {
                self.runtime.queue.push_back(item);
                true
            }
            Some(item) => {
                tracing::warn!("Flow {} targets missing node {}", flow.id, item.node);
                false
            }
            None => false,
        }
    }

    /// Publish a custom event on the engine's bus
    pub fn emit(&mut self, name: impl Into<String>, payload: EventPayload) {
        self.runtime.outbox.push(CustomEvent::new(name, payload));
    }

    /// Whether a concrete pointer path is registered
    pub fn is_valid_path(&self, path: &str) -> bool {
        self.runtime.paths.is_valid(path)
    }

    /// Read a property
    pub fn path_value(&self, path: &str) -> Option<Value> {
        self.runtime.paths.get(path)
    }

    /// Write a property
    pub fn set_path_value(&mut self, path: &str, value: Value) -> bool {
        self.runtime.paths.set(path, value)
    }

    /// Stop a running animation without completing it
    pub fn cancel_animation(&mut self, path: &str) -> bool {
        self.runtime.animations.cancel(path)
    }

    /// Start an animation; `done` is enqueued when it completes
    pub fn animate(&mut self, path: &str, params: AnimationParameters, done: Option<Flow>) {
        let completion = done.map_or(Completion::None, Completion::Flow);
        let task = AnimationTask::new(params, self.runtime.clock.now, completion);
        self.runtime.animations.start(path, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::VariableDefinition;
    use crate::types::TypeDefinition;
    use serde_json::json;

    #[test]
    fn test_clear_bumps_epoch() {
        let mut cache = EvaluationCache::default();
        cache.insert(0, "val", Value::Int(1));
        assert_eq!(cache.get(0, "val"), Some(&Value::Int(1)));

        let before = cache.epoch();
        cache.clear();
        assert!(cache.is_empty());
        assert_ne!(cache.epoch(), before);
    }

    #[test]
    fn test_variables_coerced_at_load() {
        let payload = GraphPayload {
            types: vec![TypeDefinition::new("int"), TypeDefinition::new("float3")],
            variables: vec![
                VariableDefinition {
                    id: "count".to_string(),
                    type_index: 0,
                    value: Some(json!(2.7)),
                    initial_value: None,
                },
                VariableDefinition {
                    id: "offset".to_string(),
                    type_index: 1,
                    value: Some(json!([1.0, 2.0, 3.0])),
                    initial_value: Some(json!([0.0, 0.0, 0.0])),
                },
            ],
            ..Default::default()
        };
        let graph = GraphContext::from_payload(&payload, "P:").unwrap();

        assert_eq!(graph.variable("count").unwrap().value, Value::Int(2));
        assert_eq!(graph.variable("count").unwrap().initial_value, Value::Int(2));
        assert_eq!(graph.variables[1].value, Value::Float3([1.0, 2.0, 3.0]));
        assert_eq!(graph.variables[1].initial_value, Value::Float3([0.0; 3]));
        assert_eq!(graph.event_name("ping"), "P:ping");
    }

    #[test]
    fn test_variable_with_bad_type_rejected() {
        let payload = GraphPayload {
            variables: vec![VariableDefinition {
                id: "x".to_string(),
                type_index: 4,
                value: None,
                initial_value: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            GraphContext::from_payload(&payload, ""),
            Err(LoadError::InvalidVariable { .. })
        ));
    }
}
