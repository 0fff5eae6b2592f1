// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph engine: loading, the work queue, the tick loop and animations.
//!
//! The engine is single-threaded and driven by its host. Work runs when the
//! host enqueues a flow or emits an event; time advances only through
//! [`BehaviorEngine::update`], which fires a due tick and steps animations.

use crate::animation::{AnimationParameters, AnimationTask, Completion};
use crate::config::EngineConfig;
use crate::context::{GraphContext, NodeContext, NodeSlot, Runtime, WorkItem};
use crate::error::{EngineError, LoadError, RuntimeError};
use crate::events::{CustomEvent, EventBus, EventPayload, ListenerId, Selection};
use crate::graph::{Flow, GraphPayload};
use crate::node::{BehaviorNode, NodeInit, NodeKind, Subscriptions};
use crate::nodes::create_behavior_registry;
use crate::nodes::lifecycle::{OnStart, OnTick};
use crate::pointer::{PathGetter, PathSetter};
use crate::registry::{NodeFactory, NodeRegistry};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineId(pub Uuid);

impl EngineId {
    /// Create a new random engine ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavior graph interpreter
pub struct BehaviorEngine {
    id: EngineId,
    config: EngineConfig,
    registry: NodeRegistry,
    nodes: Vec<NodeSlot>,
    graph: GraphContext,
    runtime: Runtime,
    events: EventBus,
    selections: IndexMap<usize, Vec<usize>>,
    start_node: Option<usize>,
    tick_node: Option<usize>,
    pending_tick: Option<Duration>,
    errors: Vec<EngineError>,
    loaded: bool,
}

impl BehaviorEngine {
    /// Create an engine with the built-in node kinds registered
    pub fn new(config: EngineConfig) -> Self {
        let graph = GraphContext {
            event_prefix: config.event_prefix.clone(),
            ..Default::default()
        };
        Self {
            id: EngineId::new(),
            config,
            registry: create_behavior_registry(),
            nodes: Vec::new(),
            graph,
            runtime: Runtime::default(),
            events: EventBus::new(),
            selections: IndexMap::new(),
            start_node: None,
            tick_node: None,
            pending_tick: None,
            errors: Vec::new(),
            loaded: false,
        }
    }

    /// Engine identifier
    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register (or replace) a node kind
    pub fn register_node_kind(&mut self, kind: impl Into<String>, factory: NodeFactory) {
        self.registry.register(kind, factory);
    }

    /// Node kind registry
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Bind a host property to a path pattern
    pub fn register_path(
        &mut self,
        pattern: &str,
        getter: PathGetter,
        setter: PathSetter,
        type_name: impl Into<String>,
    ) {
        self.runtime.paths.register(pattern, getter, setter, type_name);
    }

    /// Whether a concrete path is bound
    pub fn is_valid_path(&self, path: &str) -> bool {
        self.runtime.paths.is_valid(path)
    }

    /// Read a bound property
    pub fn path_value(&self, path: &str) -> Option<Value> {
        self.runtime.paths.get(path)
    }

    /// Write a bound property
    pub fn set_path_value(&mut self, path: &str, value: Value) -> bool {
        self.runtime.paths.set(path, value)
    }

    /// Declared type of a bound property
    pub fn path_type_name(&self, path: &str) -> Option<&str> {
        self.runtime.paths.type_name(path)
    }

    /// Parse and load a graph from JSON
    pub fn load_graph_json(&mut self, json: &str) -> Result<(), LoadError> {
        self.load_graph(&GraphPayload::from_json(json)?)
    }

    /// Load a graph, replacing the current one.
    ///
    /// Nothing is committed unless every node constructs. Once loaded, the
    /// start node runs; without one, the tick node runs and seeds the tick
    /// loop; without either the graph waits for host events.
    pub fn load_graph(&mut self, payload: &GraphPayload) -> Result<(), LoadError> {
        payload.validate()?;
        let graph = GraphContext::from_payload(payload, self.config.event_prefix.clone())?;

        let mut subscriptions = Subscriptions::default();
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        for (index, definition) in payload.nodes.iter().enumerate() {
            let mut init = NodeInit::new(index, definition, &graph, &mut subscriptions);
            nodes.push(RefCell::new(self.registry.create_node(&mut init)?));
        }

        self.unload();
        self.nodes = nodes;
        self.graph = graph;
        for (event, node) in subscriptions.events {
            self.events.subscribe_node(event, node);
        }
        for (scene_node, node) in subscriptions.selections {
            self.selections.entry(scene_node).or_default().push(node);
        }
        self.start_node = payload.find_kind(OnStart::KIND);
        self.tick_node = payload.find_kind(OnTick::KIND);
        self.runtime.clock.graph_started = self.runtime.clock.now;
        self.loaded = true;
        tracing::info!("Engine {} loaded graph with {} nodes", self.id, self.nodes.len());

        if let Some(start) = self.start_node {
            self.enqueue(&Flow::to("start", start));
        } else if let Some(tick) = self.tick_node {
            self.runtime.clock.last_tick = Some(self.runtime.clock.now);
            self.enqueue(&Flow::to("tick", tick));
        }
        Ok(())
    }

    /// Drop the current graph with its node listeners, queued work, pending
    /// tick and graph-driven animations
    pub fn unload(&mut self) {
        if self.loaded {
            tracing::info!("Engine {} unloaded graph", self.id);
        }
        self.nodes.clear();
        self.graph = GraphContext {
            event_prefix: self.config.event_prefix.clone(),
            ..Default::default()
        };
        self.events.clear_node_subscriptions();
        self.selections.clear();
        self.runtime.queue.clear();
        self.runtime.continuations.clear();
        self.runtime.outbox.clear();
        self.runtime.animations.cancel_graph_tasks();
        self.runtime.clock.last_tick = None;
        self.start_node = None;
        self.tick_node = None;
        self.pending_tick = None;
        self.loaded = false;
    }

    /// Whether a graph is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of nodes in the loaded graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Current engine time
    pub fn now(&self) -> Duration {
        self.runtime.clock.now
    }

    /// Current value of a graph variable
    pub fn variable(&self, id: &str) -> Option<&Value> {
        self.graph.variable(id).map(|v| &v.value)
    }

    /// Number of work items waiting
    pub fn queue_len(&self) -> usize {
        self.runtime.queue.len()
    }

    /// Engine time at which the next tick fires, if one is scheduled
    pub fn pending_tick(&self) -> Option<Duration> {
        self.pending_tick
    }

    /// Drain runtime errors recorded since the last call
    pub fn take_errors(&mut self) -> Vec<EngineError> {
        std::mem::take(&mut self.errors)
    }

    /// Append a flow to the work queue. Draining starts only when the queue
    /// was empty; otherwise the running drain reaches the new item.
    pub fn enqueue(&mut self, flow: &Flow) {
        let Some(item) = WorkItem::from_flow(flow) else {
            return;
        };
        if item.node >= self.nodes.len() {
            tracing::warn!("Flow {} targets missing node {}", flow.id, item.node);
            return;
        }
        let was_empty = self.runtime.queue.is_empty();
        self.runtime.queue.push_back(item);
        if was_empty {
            self.drain();
        }
    }

    /// Publish an event on the bus; subscribed receive nodes enqueue work
    pub fn emit_custom_event(&mut self, name: impl Into<String>, payload: EventPayload) {
        let was_empty = self.runtime.queue.is_empty();
        self.dispatch(CustomEvent::new(name, payload));
        if was_empty && !self.runtime.queue.is_empty() {
            self.drain();
        }
    }

    /// Subscribe a host callback to an event name
    pub fn add_custom_event_listener(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&CustomEvent) + 'static,
    ) -> ListenerId {
        self.events.add_listener(name, Box::new(callback))
    }

    /// Remove one host callback
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Remove every listener, including those of receive nodes
    pub fn clear_custom_event_listeners(&mut self) {
        self.events.remove_all_listeners();
    }

    /// Deliver a pick to the nodes watching `scene_node`, which is the hit
    /// node itself or one of its ancestors. Returns whether the selection
    /// should propagate to `scene_node`'s parent.
    pub fn select_node(&mut self, scene_node: usize, selection: Selection) -> bool {
        let Some(targets) = self.selections.get(&scene_node).cloned() else {
            return true;
        };
        let was_empty = self.runtime.queue.is_empty();
        let mut propagate = true;
        for index in targets {
            let result = Self::with_node(&self.nodes, &mut self.graph, &mut self.runtime, index, |node, cx| {
                node.on_select(&selection, cx)
            });
            match result {
                Ok(keep_going) => propagate &= keep_going,
                Err(error) => self.record(error),
            }
        }
        if was_empty && !self.runtime.queue.is_empty() {
            self.drain();
        }
        propagate
    }

    /// Animate a bound property, replacing any animation running on it
    pub fn animate_property(
        &mut self,
        path: &str,
        params: AnimationParameters,
        on_complete: impl FnOnce() + 'static,
    ) {
        let task = AnimationTask::new(
            params,
            self.runtime.clock.now,
            Completion::Callback(Box::new(on_complete)),
        );
        self.runtime.animations.start(path, task);
    }

    /// Stop an animation without completing it
    pub fn cancel_animation(&mut self, path: &str) -> bool {
        self.runtime.animations.cancel(path)
    }

    /// Whether an animation is running on a path
    pub fn is_animating(&self, path: &str) -> bool {
        self.runtime.animations.is_animating(path)
    }

    /// Advance engine time: step animations, then fire the tick if due
    pub fn update(&mut self, delta: Duration) {
        self.runtime.clock.now += delta;
        let now = self.runtime.clock.now;

        let completions = self.runtime.animations.step(now, &self.runtime.paths);
        for completion in completions {
            match completion {
                Completion::None => {}
                Completion::Flow(flow) => self.enqueue(&flow),
                Completion::Callback(callback) => callback(),
            }
        }

        if let (Some(due), Some(tick)) = (self.pending_tick, self.tick_node) {
            if now >= due {
                self.pending_tick = None;
                self.runtime.clock.last_tick = Some(now);
                self.enqueue(&Flow::to("tick", tick));
            }
        }
    }

    fn drain(&mut self) {
        while let Some(item) = self.runtime.queue.front().cloned() {
            self.run_chain(item);
            self.runtime.queue.pop_front();
        }
        self.schedule_tick();
    }

    /// Process one work item and every flow it continues synchronously
    fn run_chain(&mut self, item: WorkItem) {
        let mut stack = vec![item];
        while let Some(WorkItem { node, socket }) = stack.pop() {
            tracing::debug!("Processing node {} at {:?}", node, socket);
            let result = Self::with_node(&self.nodes, &mut self.graph, &mut self.runtime, node, |n, cx| {
                n.process(socket.as_deref(), cx)
            });
            let continuations = std::mem::take(&mut self.runtime.continuations);
            self.dispatch_outbox();

            if let Err(error) = result {
                self.record(error);
                return;
            }
            stack.extend(continuations.iter().rev().filter_map(WorkItem::from_flow));
        }
    }

    fn schedule_tick(&mut self) {
        if self.pending_tick.is_some() || self.tick_node.is_none() {
            return;
        }
        let now = self.runtime.clock.now;
        let interval = self.config.tick_interval();
        let since = self
            .runtime
            .clock
            .last_tick
            .map_or(interval, |last| now.saturating_sub(last));
        self.pending_tick = Some(now + interval.saturating_sub(since));
    }

    fn dispatch_outbox(&mut self) {
        for event in std::mem::take(&mut self.runtime.outbox) {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: CustomEvent) {
        tracing::debug!("Dispatching event {}", event.name);
        for index in self.events.notify(&event) {
            let result = Self::with_node(&self.nodes, &mut self.graph, &mut self.runtime, index, |node, cx| {
                node.on_custom_event(&event, cx)
            });
            if let Err(error) = result {
                self.record(error);
            }
        }
    }

    fn with_node<T>(
        nodes: &[NodeSlot],
        graph: &mut GraphContext,
        runtime: &mut Runtime,
        index: usize,
        f: impl FnOnce(&mut dyn BehaviorNode, &mut NodeContext<'_>) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let slot = nodes.get(index).ok_or(RuntimeError::UnknownNode(index))?;
        let mut node = slot
            .try_borrow_mut()
            .map_err(|_| RuntimeError::ReentrantEvaluation(index))?;
        let mut cx = NodeContext::new(nodes, graph, runtime);
        f(&mut **node, &mut cx)
    }

    fn record(&mut self, error: RuntimeError) {
        tracing::error!("Engine {}: {}", self.id, error);
        self.errors.push(EngineError::Runtime(error));
    }
}

impl Default for BehaviorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for BehaviorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorEngine")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("queue", &self.runtime.queue.len())
            .field("loaded", &self.loaded)
            .finish()
    }
}
