// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.

pub mod custom_event;
pub mod lifecycle;
pub mod math;
pub mod pointer;
pub mod selection;
pub mod variable;

use crate::registry::NodeRegistry;

/// Create a registry holding every built-in node kind
pub fn create_behavior_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Lifecycle
    registry.register_kind::<lifecycle::OnStart>();
    registry.register_kind::<lifecycle::OnTick>();

    // Host ingress and egress
    registry.register_kind::<custom_event::Send>();
    registry.register_kind::<custom_event::Receive>();
    registry.register_kind::<selection::OnSelect>();

    // State
    registry.register_kind::<variable::VariableGet>();
    registry.register_kind::<variable::VariableSet>();
    registry.register_kind::<pointer::PointerSet>();
    registry.register_kind::<pointer::PointerAnimateTo>();

    // Data
    registry.register_kind::<math::Add>();
    registry.register_kind::<math::Equal>();
    registry.register_kind::<math::Select>();

    registry
}
