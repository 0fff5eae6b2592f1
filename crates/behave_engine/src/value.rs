// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed values flowing through value sockets, and the two coercion tables
//! used to build them from raw JSON.

use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a value socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// 32-bit integer
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Float2,
    /// 3D vector
    Float3,
    /// 4D vector / quaternion (scalar first)
    Float4,
    /// Column-major 4x4 matrix
    Float4x4,
    /// Type declared by an extension, carried opaquely
    Custom(String),
}

impl ValueType {
    /// Resolve a type-table name
    pub fn from_name(name: &str) -> Self {
        match name {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float" => Self::Float,
            "float2" => Self::Float2,
            "float3" => Self::Float3,
            "float4" => Self::Float4,
            "float4x4" => Self::Float4x4,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Type-table name of this type
    pub fn name(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Float4x4 => "float4x4",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value that can be stored in a socket, variable or property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Float2([f32; 2]),
    /// 3D vector
    Float3([f32; 3]),
    /// 4D vector
    Float4([f32; 4]),
    /// 4x4 matrix
    Float4x4([f32; 16]),
    /// Extension-defined value, passed through untouched
    Custom {
        /// Resolved type name
        type_name: String,
        /// Raw payload
        raw: serde_json::Value,
    },
}

impl Value {
    /// Get the type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Float2(_) => ValueType::Float2,
            Self::Float3(_) => ValueType::Float3,
            Self::Float4(_) => ValueType::Float4,
            Self::Float4x4(_) => ValueType::Float4x4,
            Self::Custom { type_name, .. } => ValueType::Custom(type_name.clone()),
        }
    }

    /// Get as bool if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as int if possible
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float, widening ints
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Get as 3D vector if possible
    pub fn as_float3(&self) -> Option<[f32; 3]> {
        match self {
            Self::Float3(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 4D vector if possible
    pub fn as_float4(&self) -> Option<[f32; 4]> {
        match self {
            Self::Float4(v) => Some(*v),
            _ => None,
        }
    }

    /// Plain JSON form (vectors as arrays)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => number(*v),
            Self::Float2(v) => components_to_json(v),
            Self::Float3(v) => components_to_json(v),
            Self::Float4(v) => components_to_json(v),
            Self::Float4x4(v) => components_to_json(v),
            Self::Custom { raw, .. } => raw.clone(),
        }
    }

    /// Form carried in a custom event payload. Inverse of
    /// [`decode_event_param`].
    pub fn encode_event_param(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::Value::String(v.to_string()),
            Self::Int(_) | Self::Float(_) | Self::Custom { .. } => self.to_json(),
            Self::Float2(_) | Self::Float3(_) | Self::Float4(_) | Self::Float4x4(_) => {
                serde_json::Value::String(self.to_json().to_string())
            }
        }
    }

    /// Text substituted for a `{placeholder}` in a pointer template
    pub fn path_segment(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", *v as i64),
            Self::Custom {
                raw: serde_json::Value::String(s),
                ..
            } => s.clone(),
            other => match other.to_json() {
                serde_json::Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }
}

fn number(v: f32) -> serde_json::Value {
    serde_json::Number::from_f64(f64::from(v))
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn components_to_json(v: &[f32]) -> serde_json::Value {
    serde_json::Value::Array(v.iter().copied().map(number).collect())
}

fn coercion_error(type_name: &str, raw: &serde_json::Value) -> RuntimeError {
    RuntimeError::Coercion {
        type_name: type_name.to_string(),
        raw: raw.to_string(),
    }
}

fn numeric(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn truncate_int(v: f64) -> i32 {
    v.trunc() as i32
}

fn components<const N: usize>(raw: &serde_json::Value) -> Option<[f32; N]> {
    let items = raw.as_array()?;
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

fn vector_value(value_type: &ValueType, raw: &serde_json::Value) -> Option<Value> {
    match value_type {
        ValueType::Float2 => components(raw).map(Value::Float2),
        ValueType::Float3 => components(raw).map(Value::Float3),
        ValueType::Float4 => components(raw).map(Value::Float4),
        ValueType::Float4x4 => components(raw).map(Value::Float4x4),
        _ => None,
    }
}

/// Coerce a literal declared in the graph (lenient table).
///
/// `bool` accepts `true` or `"true"`, `int` truncates, floats, vectors and
/// matrices take their declared literal unchanged.
pub fn coerce_literal(type_name: &str, raw: &serde_json::Value) -> Result<Value> {
    let value_type = ValueType::from_name(type_name);
    let value = match &value_type {
        ValueType::Bool => Some(Value::Bool(
            raw.as_bool() == Some(true) || raw.as_str() == Some("true"),
        )),
        ValueType::Int => numeric(raw).map(|v| Value::Int(truncate_int(v))),
        ValueType::Float => numeric(raw).map(|v| Value::Float(v as f32)),
        ValueType::Float2 | ValueType::Float3 | ValueType::Float4 | ValueType::Float4x4 => {
            vector_value(&value_type, raw)
        }
        ValueType::Custom(name) => Some(Value::Custom {
            type_name: name.clone(),
            raw: raw.clone(),
        }),
    };
    value.ok_or_else(|| coercion_error(type_name, raw))
}

/// Decode a parameter carried by a custom event (strict table).
///
/// `bool` is true only for the string `"true"`, numbers parse, vectors and
/// matrices parse a JSON-encoded array.
pub fn decode_event_param(type_name: &str, raw: &serde_json::Value) -> Result<Value> {
    let value_type = ValueType::from_name(type_name);
    let value = match &value_type {
        ValueType::Bool => Some(Value::Bool(raw.as_str() == Some("true"))),
        ValueType::Int => numeric(raw).map(|v| Value::Int(truncate_int(v))),
        ValueType::Float => numeric(raw).map(|v| Value::Float(v as f32)),
        ValueType::Float2 | ValueType::Float3 | ValueType::Float4 | ValueType::Float4x4 => {
            match raw {
                serde_json::Value::String(text) => serde_json::from_str(text)
                    .ok()
                    .and_then(|parsed| vector_value(&value_type, &parsed)),
                other => vector_value(&value_type, other),
            }
        }
        ValueType::Custom(name) => Some(Value::Custom {
            type_name: name.clone(),
            raw: raw.clone(),
        }),
    };
    value.ok_or_else(|| coercion_error(type_name, raw))
}
