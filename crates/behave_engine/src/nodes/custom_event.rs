// SPDX-License-Identifier: MIT OR Apache-2.0
//! Custom event send and receive nodes.
//!
//! Both resolve their event through the `customEvent` configuration index
//! into the graph's custom event table. The bus name is the engine's event
//! prefix followed by the descriptor id.

use crate::context::NodeContext;
use crate::error::{LoadError, Result, RuntimeError};
use crate::events::{CustomEvent, EventPayload};
use crate::graph::CustomEventDescriptor;
use crate::node::{BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
use crate::value::decode_event_param;

fn event_descriptor(
    base: &NodeBase,
    init: &NodeInit<'_>,
) -> std::result::Result<CustomEventDescriptor, LoadError> {
    let index = base.configuration_index("customEvent")?;
    init.graph
        .custom_events
        .get(index)
        .cloned()
        .ok_or_else(|| base.invalid_configuration("customEvent", format!("no custom event {index}")))
}

/// Emits a custom event carrying the event's declared parameters
pub struct Send {
    base: NodeBase,
    descriptor: CustomEventDescriptor,
    event_name: String,
}

impl BehaviorNode for Send {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        cx.clear_evaluation_cache();
        let mut payload = EventPayload::new();
        for parameter in &self.descriptor.values {
            let value = self.base.evaluate(&parameter.id, cx)?;
            payload.insert(parameter.id.clone(), value.encode_event_param());
        }

        tracing::debug!("Sending {}", self.event_name);
        cx.emit(self.event_name.clone(), payload);
        self.base.continue_flow("out", cx);
        Ok(Outputs::new())
    }
}

impl NodeKind for Send {
    const KIND: &'static str = "customEvent/send";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("Send");
        let descriptor = event_descriptor(&base, init)?;
        let ids: Vec<&str> = descriptor.values.iter().map(|p| p.id.as_str()).collect();
        base.require_values(&ids)?;
        let event_name = init.graph.event_name(&descriptor.id);
        Ok(Self {
            base,
            descriptor,
            event_name,
        })
    }
}

/// Listens for a custom event, publishes its decoded parameters and
/// enqueues `out`
pub struct Receive {
    base: NodeBase,
    descriptor: CustomEventDescriptor,
}

impl BehaviorNode for Receive {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, _cx: &mut NodeContext<'_>) -> Result<Outputs> {
        Ok(self.base.published().clone())
    }

    fn on_custom_event(&mut self, event: &CustomEvent, cx: &mut NodeContext<'_>) -> Result<()> {
        let mut decoded = Outputs::new();
        for (key, raw) in &event.payload {
            let parameter =
                self.descriptor
                    .parameter(key)
                    .ok_or_else(|| RuntimeError::UnknownEventParameter {
                        event: event.name.clone(),
                        parameter: key.clone(),
                    })?;
            let type_name = cx.graph().types.type_name(parameter.type_index)?;
            decoded.insert(key.clone(), decode_event_param(type_name, raw)?);
        }

        for (key, value) in decoded {
            self.base.publish(key, value);
        }
        cx.clear_evaluation_cache();
        self.base.enqueue_flow("out", cx);
        Ok(())
    }
}

impl NodeKind for Receive {
    const KIND: &'static str = "customEvent/receive";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("CustomEventReceiveNode");
        let descriptor = event_descriptor(&base, init)?;
        let event_name = init.graph.event_name(&descriptor.id);
        init.subscribe(event_name);
        Ok(Self { base, descriptor })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::BehaviorEngine;
    use crate::error::{EngineError, LoadError, RuntimeError};
    use crate::events::EventPayload;
    use crate::value::Value;
    use serde_json::json;

    /// receive(toggle) -> set variable `on` from the event's `on` parameter,
    /// receive(move) -> set variable `offset`
    fn receiver_graph() -> String {
        json!({
            "nodes": [
                {"type": "customEvent/receive",
                 "configuration": [{"id": "customEvent", "value": 0}],
                 "flows": [{"id": "out", "node": 1}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "on", "node": 0, "socket": "on"}]},
                {"type": "customEvent/receive",
                 "configuration": [{"id": "customEvent", "value": 1}],
                 "flows": [{"id": "out", "node": 3}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 1}],
                 "values": [{"id": "offset", "node": 2, "socket": "offset"}]}
            ],
            "variables": [
                {"id": "on", "type": 0, "value": false},
                {"id": "offset", "type": 1, "value": [0.0, 0.0, 0.0]}
            ],
            "customEvents": [
                {"id": "toggle", "values": [{"id": "on", "type": 0}]},
                {"id": "move", "values": [{"id": "offset", "type": 1}]}
            ],
            "types": [{"signature": "bool"}, {"signature": "float3"}]
        })
        .to_string()
    }

    fn payload(entries: serde_json::Value) -> EventPayload {
        serde_json::from_value(entries).unwrap()
    }

    #[test]
    fn test_receive_decodes_strictly() {
        let mut engine = BehaviorEngine::default();
        engine.load_graph_json(&receiver_graph()).unwrap();

        engine.emit_custom_event("KHR_INTERACTIVITY:toggle", payload(json!({"on": "true"})));
        assert_eq!(engine.variable("on"), Some(&Value::Bool(true)));

        engine.emit_custom_event("KHR_INTERACTIVITY:toggle", payload(json!({"on": true})));
        assert_eq!(engine.variable("on"), Some(&Value::Bool(false)));

        engine.emit_custom_event(
            "KHR_INTERACTIVITY:move",
            payload(json!({"offset": "[1.0, 2.0, 3.0]"})),
        );
        assert_eq!(engine.variable("offset"), Some(&Value::Float3([1.0, 2.0, 3.0])));
        assert!(engine.take_errors().is_empty());
    }

    #[test]
    fn test_unknown_parameter_fails_only_that_delivery() {
        let mut engine = BehaviorEngine::default();
        engine.load_graph_json(&receiver_graph()).unwrap();

        engine.emit_custom_event("KHR_INTERACTIVITY:toggle", payload(json!({"bogus": 1})));
        let errors = engine.take_errors();
        assert!(matches!(
            errors.as_slice(),
            [EngineError::Runtime(RuntimeError::UnknownEventParameter { .. })]
        ));
        assert_eq!(engine.variable("on"), Some(&Value::Bool(false)));

        engine.emit_custom_event("KHR_INTERACTIVITY:toggle", payload(json!({"on": "true"})));
        assert_eq!(engine.variable("on"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_send_round_trips_into_receive() {
        let mut engine = BehaviorEngine::default();
        let graph = json!({
            "nodes": [
                {"type": "customEvent/receive",
                 "configuration": [{"id": "customEvent", "value": 0}],
                 "flows": [{"id": "out", "node": 1}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "flag", "node": 0, "socket": "flag"}]},
                {"type": "customEvent/send",
                 "configuration": [{"id": "customEvent", "value": 0}],
                 "values": [{"id": "flag", "value": true, "type": 0}]},
                {"type": "lifecycle/onStart", "flows": [{"id": "out", "node": 2}]}
            ],
            "variables": [{"id": "flag", "type": 0, "value": false}],
            "customEvents": [{"id": "ping", "values": [{"id": "flag", "type": 0}]}],
            "types": [{"signature": "bool"}]
        })
        .to_string();
        engine.load_graph_json(&graph).unwrap();

        assert_eq!(engine.variable("flag"), Some(&Value::Bool(true)));
        assert!(engine.take_errors().is_empty());
    }

    #[test]
    fn test_send_requires_schema_values() {
        let mut engine = BehaviorEngine::default();
        let graph = json!({
            "nodes": [
                {"type": "customEvent/send", "configuration": [{"id": "customEvent", "value": 0}]}
            ],
            "customEvents": [{"id": "ping", "values": [{"id": "flag", "type": 0}]}],
            "types": [{"signature": "bool"}]
        })
        .to_string();
        assert!(matches!(
            engine.load_graph_json(&graph),
            Err(LoadError::MissingValue { id, .. }) if id == "flag"
        ));
    }

    #[test]
    fn test_missing_event_configuration() {
        let mut engine = BehaviorEngine::default();
        let graph = json!({"nodes": [{"type": "customEvent/receive"}]}).to_string();
        assert!(matches!(
            engine.load_graph_json(&graph),
            Err(LoadError::MissingConfiguration { .. })
        ));

        let graph = json!({
            "nodes": [{"type": "customEvent/receive", "configuration": [{"id": "customEvent", "value": 3}]}]
        })
        .to_string();
        assert!(matches!(
            engine.load_graph_json(&graph),
            Err(LoadError::InvalidConfiguration { .. })
        ));
    }
}
