// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure data nodes. Each publishes its result on the `val` socket.

use crate::context::NodeContext;
use crate::error::{LoadError, Result, RuntimeError};
use crate::node::{single_output, BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
use crate::value::{Value, ValueType};

/// Output socket of every math node
pub const OUTPUT: &str = "val";

fn same_type(base: &NodeBase, a: &Value, b: &Value) -> Result<()> {
    let (left, right) = (a.value_type(), b.value_type());
    if left != right {
        return Err(RuntimeError::TypeMismatch {
            node: base.name().to_string(),
            left,
            right,
        });
    }
    Ok(())
}

macro_rules! data_node {
    ($name:ident) => {
        impl BehaviorNode for $name {
            fn base(&self) -> &NodeBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut NodeBase {
                &mut self.base
            }

            fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
                self.compute(cx).map(|value| single_output(OUTPUT, value))
            }
        }
    };
}

/// `a + b` for `int` (wrapping), `float` and `float3`
pub struct Add {
    base: NodeBase,
}

impl Add {
    fn compute(&self, cx: &mut NodeContext<'_>) -> Result<Value> {
        let a = self.base.evaluate("a", cx)?;
        let b = self.base.evaluate("b", cx)?;
        same_type(&self.base, &a, &b)?;

        match (a, b) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Float3(a), Value::Float3(b)) => {
                Ok(Value::Float3(std::array::from_fn(|i| a[i] + b[i])))
            }
            (a, _) => Err(RuntimeError::InvalidType {
                node: self.base.name().to_string(),
                value_type: a.value_type(),
            }),
        }
    }
}

data_node!(Add);

impl NodeKind for Add {
    const KIND: &'static str = "math/add";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("AddNode");
        base.require_values(&["a", "b"])?;
        Ok(Self { base })
    }
}

/// `a == b` for operands of the same type
pub struct Equal {
    base: NodeBase,
}

impl Equal {
    fn compute(&self, cx: &mut NodeContext<'_>) -> Result<Value> {
        let a = self.base.evaluate("a", cx)?;
        let b = self.base.evaluate("b", cx)?;
        same_type(&self.base, &a, &b)?;
        Ok(Value::Bool(a == b))
    }
}

data_node!(Equal);

impl NodeKind for Equal {
    const KIND: &'static str = "math/eq";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("EqualityNode");
        base.require_values(&["a", "b"])?;
        Ok(Self { base })
    }
}

/// `condition ? a : b`
pub struct Select {
    base: NodeBase,
}

impl Select {
    fn compute(&self, cx: &mut NodeContext<'_>) -> Result<Value> {
        let a = self.base.evaluate("a", cx)?;
        let b = self.base.evaluate("b", cx)?;
        let condition = self.base.evaluate("condition", cx)?;
        same_type(&self.base, &a, &b)?;

        match condition {
            Value::Bool(true) => Ok(a),
            Value::Bool(false) => Ok(b),
            other => Err(RuntimeError::InvalidType {
                node: self.base.name().to_string(),
                value_type: other.value_type(),
            }),
        }
    }
}

data_node!(Select);

impl NodeKind for Select {
    const KIND: &'static str = "math/select";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("SelectNode");
        base.require_values(&["a", "b", "condition"])?;
        Ok(Self { base })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BehaviorEngine;
    use crate::error::EngineError;
    use serde_json::json;

    /// onStart -> set `result` from node 0's `val`
    fn run(data_node: serde_json::Value, result_type: usize) -> BehaviorEngine {
        let initial = match result_type {
            0 => json!(0),
            1 => json!(0.0),
            2 => json!([0.0, 0.0, 0.0]),
            _ => json!(false),
        };
        let mut engine = BehaviorEngine::default();
        let graph = json!({
            "nodes": [
                data_node,
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "result", "node": 0, "socket": "val"}]},
                {"type": "lifecycle/onStart", "flows": [{"id": "out", "node": 1}]}
            ],
            "variables": [{"id": "result", "type": result_type, "value": initial}],
            "types": [
                {"signature": "int"}, {"signature": "float"},
                {"signature": "float3"}, {"signature": "bool"}
            ]
        })
        .to_string();
        engine.load_graph_json(&graph).unwrap();
        engine
    }

    fn binary(kind: &str, a: serde_json::Value, a_type: usize, b: serde_json::Value, b_type: usize) -> serde_json::Value {
        json!({"type": kind, "values": [
            {"id": "a", "value": a, "type": a_type},
            {"id": "b", "value": b, "type": b_type}
        ]})
    }

    #[test]
    fn test_add_int_wraps() {
        let engine = run(binary("math/add", json!(i32::MAX), 0, json!(1), 0), 0);
        assert_eq!(engine.variable("result"), Some(&Value::Int(i32::MIN)));
    }

    #[test]
    fn test_add_float3_per_component() {
        let engine = run(
            binary("math/add", json!([1.0, 2.0, 3.0]), 2, json!([0.5, 0.5, 0.5]), 2),
            2,
        );
        assert_eq!(engine.variable("result"), Some(&Value::Float3([1.5, 2.5, 3.5])));
    }

    #[test]
    fn test_add_mismatched_types_is_runtime_error() {
        let mut engine = run(binary("math/add", json!(1), 0, json!(1.0), 1), 0);
        assert_eq!(engine.variable("result"), Some(&Value::Int(0)));
        assert!(matches!(
            engine.take_errors().as_slice(),
            [EngineError::Runtime(RuntimeError::TypeMismatch {
                left: ValueType::Int,
                right: ValueType::Float,
                ..
            })]
        ));
    }

    #[test]
    fn test_add_rejects_bool() {
        let mut engine = run(binary("math/add", json!(true), 3, json!(false), 3), 3);
        assert!(matches!(
            engine.take_errors().as_slice(),
            [EngineError::Runtime(RuntimeError::InvalidType { .. })]
        ));
    }

    #[test]
    fn test_eq() {
        let engine = run(binary("math/eq", json!(2.5), 1, json!(2.5), 1), 3);
        assert_eq!(engine.variable("result"), Some(&Value::Bool(true)));

        let engine = run(binary("math/eq", json!([1.0, 0.0, 0.0]), 2, json!([0.0, 1.0, 0.0]), 2), 3);
        assert_eq!(engine.variable("result"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_select() {
        let select = |condition: serde_json::Value, condition_type: usize| {
            json!({"type": "math/select", "values": [
                {"id": "a", "value": 1, "type": 0},
                {"id": "b", "value": 2, "type": 0},
                {"id": "condition", "value": condition, "type": condition_type}
            ]})
        };

        let engine = run(select(json!(true), 3), 0);
        assert_eq!(engine.variable("result"), Some(&Value::Int(1)));
        let engine = run(select(json!("false"), 3), 0);
        assert_eq!(engine.variable("result"), Some(&Value::Int(2)));

        let mut engine = run(select(json!(1), 0), 0);
        assert!(matches!(
            engine.take_errors().as_slice(),
            [EngineError::Runtime(RuntimeError::InvalidType { value_type: ValueType::Int, .. })]
        ));
    }
}
