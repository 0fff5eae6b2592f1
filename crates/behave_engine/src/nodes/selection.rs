// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene selection entry point.

use crate::context::NodeContext;
use crate::error::{LoadError, Result};
use crate::events::Selection;
use crate::node::{BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
use crate::value::Value;
use serde_json::json;

/// Fires when the host picks the configured scene node.
///
/// Publishes `localHitLocation` and `hitNodeIndex`, then enqueues `out`.
/// With `stopPropagation` set, the selection does not bubble to the scene
/// node's parent.
pub struct OnSelect {
    base: NodeBase,
    stop_propagation: bool,
}

impl BehaviorNode for OnSelect {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, _cx: &mut NodeContext<'_>) -> Result<Outputs> {
        Ok(self.base.published().clone())
    }

    fn on_select(&mut self, selection: &Selection, cx: &mut NodeContext<'_>) -> Result<bool> {
        let hit_node = i32::try_from(selection.hit_node).unwrap_or(i32::MAX);
        self.base
            .publish("localHitLocation", Value::Float3(selection.local_hit_location));
        self.base.publish("hitNodeIndex", Value::Int(hit_node));
        cx.clear_evaluation_cache();
        self.base.enqueue_flow("out", cx);
        Ok(!self.stop_propagation)
    }
}

impl NodeKind for OnSelect {
    const KIND: &'static str = "node/onSelect";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let mut base = init.base("OnSelect");
        let scene_node = base.configuration_index("nodeIndex")?;
        base.default_configuration("stopPropagation", json!(false));
        let stop_propagation = match base.configuration("stopPropagation") {
            Some(serde_json::Value::Bool(flag)) => *flag,
            _ => {
                return Err(base.invalid_configuration("stopPropagation", "expected a boolean"));
            }
        };

        base.publish("localHitLocation", Value::Float3([0.0; 3]));
        base.publish("hitNodeIndex", Value::Int(-1));
        init.subscribe_selection(scene_node);
        Ok(Self {
            base,
            stop_propagation,
        })
    }
}
