// SPDX-License-Identifier: MIT OR Apache-2.0
//! Custom event bus scoped to one engine instance.
//!
//! Host code subscribes with callbacks; receive nodes subscribe by index and
//! are notified by the engine, which owns the nodes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Loosely typed event parameters, decoded per the receiving event's schema
pub type EventPayload = IndexMap<String, serde_json::Value>;

/// Callback invoked for every matching event
pub type EventCallback = Box<dyn FnMut(&CustomEvent)>;

/// A named event with its payload
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    /// Full event name (including the engine's prefix for graph events)
    pub name: String,
    /// Parameters
    pub payload: EventPayload,
}

impl CustomEvent {
    /// Create an event
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// A host report that a scene node was picked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Scene node that was hit
    pub hit_node: usize,
    /// Hit position in the hit node's local space
    pub local_hit_location: [f32; 3],
}

/// Handle identifying a host listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    /// Create a new random listener ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

struct HostListener {
    id: ListenerId,
    name: String,
    callback: EventCallback,
}

/// Publish/subscribe registry
#[derive(Default)]
pub struct EventBus {
    host: Vec<HostListener>,
    nodes: IndexMap<String, Vec<usize>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host callback for an event name
    pub fn add_listener(&mut self, name: impl Into<String>, callback: EventCallback) -> ListenerId {
        let id = ListenerId::new();
        self.host.push(HostListener {
            id,
            name: name.into(),
            callback,
        });
        id
    }

    /// Remove one host callback
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.host.len();
        self.host.retain(|l| l.id != id);
        self.host.len() != before
    }

    /// Remove every host callback and node subscription
    pub fn remove_all_listeners(&mut self) {
        self.host.clear();
        self.nodes.clear();
    }

    /// Subscribe a node index to an event name
    pub fn subscribe_node(&mut self, name: impl Into<String>, node: usize) {
        self.nodes.entry(name.into()).or_default().push(node);
    }

    /// Drop all node subscriptions, keeping host callbacks
    pub fn clear_node_subscriptions(&mut self) {
        self.nodes.clear();
    }

    /// Number of listeners (host and node) for an event name
    pub fn listener_count(&self, name: &str) -> usize {
        self.host.iter().filter(|l| l.name == name).count()
            + self.nodes.get(name).map_or(0, Vec::len)
    }

    /// Invoke matching host callbacks and return the node indices that must
    /// also receive the event
    pub fn notify(&mut self, event: &CustomEvent) -> Vec<usize> {
        for listener in self.host.iter_mut().filter(|l| l.name == event.name) {
            (listener.callback)(event);
        }
        self.nodes.get(&event.name).cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("host_listeners", &self.host.len())
            .field("node_subscriptions", &self.nodes)
            .finish()
    }
}
