// SPDX-License-Identifier: MIT OR Apache-2.0
//! Behavior graph interpreter.
//!
//! A behavior graph is a declarative description of interactive logic:
//! nodes connected by flows (control) and value references (data). The
//! engine loads a graph, runs its entry points and reacts to host input.
//!
//! ## Architecture
//!
//! - Flows are processed one work item at a time from a FIFO queue;
//!   continuations run depth-first before the next queued item
//! - Values are pulled lazily from producer nodes and memoized until a
//!   node clears the per-step cache
//! - Scene properties are reached through a JSON-pointer-like path trie
//!   whose leaves hold host getters and setters
//! - Property animations are eased per path, with at most one per path
//! - The host drives time through [`BehaviorEngine::update`]

pub mod animation;
pub mod config;
pub mod context;
pub mod easing;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod pointer;
pub mod registry;
pub mod types;
pub mod value;

pub use animation::AnimationParameters;
pub use config::EngineConfig;
pub use easing::{EasingCurve, EasingType};
pub use engine::{BehaviorEngine, EngineId};
pub use error::{EngineError, LoadError, RuntimeError};
pub use events::{CustomEvent, EventPayload, ListenerId, Selection};
pub use graph::{Flow, GraphPayload, NodeDefinition};
pub use node::{BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
pub use pointer::PathRegistry;
pub use registry::NodeRegistry;
pub use value::{Value, ValueType};
