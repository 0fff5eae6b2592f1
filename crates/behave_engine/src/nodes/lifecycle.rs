// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lifecycle entry points.

use crate::context::NodeContext;
use crate::error::{LoadError, Result};
use crate::node::{BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
use crate::value::Value;
use std::time::Duration;

/// Runs once when the graph loads
pub struct OnStart {
    base: NodeBase,
}

impl BehaviorNode for OnStart {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }
}

impl NodeKind for OnStart {
    const KIND: &'static str = "lifecycle/onStart";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        Ok(Self {
            base: init.base("OnStartNode"),
        })
    }
}

/// Runs at the engine's tick rate.
///
/// Publishes `timeSinceStart` and `timeSinceLastTick` in seconds.
pub struct OnTick {
    base: NodeBase,
    last_tick: Option<Duration>,
}

impl BehaviorNode for OnTick {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        let now = cx.now();
        let since_start = now.saturating_sub(cx.graph_started());
        let since_last = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_tick = Some(now);

        self.base
            .publish("timeSinceStart", Value::Float(since_start.as_secs_f32()));
        self.base
            .publish("timeSinceLastTick", Value::Float(since_last.as_secs_f32()));
        cx.clear_evaluation_cache();
        self.base.continue_flow("out", cx);
        Ok(self.base.published().clone())
    }
}

impl NodeKind for OnTick {
    const KIND: &'static str = "lifecycle/onTick";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let mut base = init.base("OnTickNode");
        base.publish("timeSinceStart", Value::Float(0.0));
        base.publish("timeSinceLastTick", Value::Float(0.0));
        Ok(Self {
            base,
            last_tick: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::BehaviorEngine;
    use crate::value::Value;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_on_start_continues_out() {
        let mut engine = BehaviorEngine::default();
        let payload = json!({
            "nodes": [
                {"type": "lifecycle/onStart", "flows": [{"id": "out", "node": 1}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "started", "value": true, "type": 0}]}
            ],
            "variables": [{"id": "started", "type": 0, "value": false}],
            "types": [{"signature": "bool"}]
        })
        .to_string();
        engine.load_graph_json(&payload).unwrap();
        assert_eq!(engine.variable("started"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_on_tick_publishes_elapsed_time() {
        let mut engine = BehaviorEngine::default();
        let payload = json!({
            "nodes": [
                {"type": "lifecycle/onTick", "flows": [{"id": "out", "node": 1}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "elapsed", "node": 0, "socket": "timeSinceStart"}]}
            ],
            "variables": [{"id": "elapsed", "type": 0, "value": -1.0}],
            "types": [{"signature": "float"}]
        })
        .to_string();
        engine.load_graph_json(&payload).unwrap();
        assert_eq!(engine.variable("elapsed"), Some(&Value::Float(0.0)));

        engine.update(Duration::from_secs(2));
        let elapsed = engine.variable("elapsed").and_then(Value::as_float).unwrap();
        assert!((elapsed - 2.0).abs() < 1e-4);
        assert!(engine.pending_tick().is_some());
    }
}
