// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing functions used by property animation.
//!
//! All functions take progress `t` already clamped to `[0, 1]`.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// Easing curve kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EasingType {
    /// Cubic Bezier through two control points
    CubicBezier,
    /// Spherical interpolation of unit quaternions
    Spherical,
    /// Straight interpolation
    Linear,
    /// Unsupported code; jumps to the target
    Snap,
}

impl EasingType {
    /// Decode the integer code carried by graphs
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::CubicBezier,
            1 => Self::Spherical,
            2 => Self::Linear,
            _ => Self::Snap,
        }
    }
}

/// Parameters of one eased transition
#[derive(Debug, Clone, PartialEq)]
pub struct EasingParameters<T> {
    /// Curve kind
    pub easing_type: EasingType,
    /// Value at `t = 0`
    pub initial_value: T,
    /// Value at `t = 1`
    pub target_value: T,
    /// First Bezier control point
    pub cp1: Option<T>,
    /// Second Bezier control point
    pub cp2: Option<T>,
}

impl<T> EasingParameters<T> {
    /// Create parameters without control points
    pub fn new(easing_type: EasingType, initial_value: T, target_value: T) -> Self {
        Self {
            easing_type,
            initial_value,
            target_value,
            cp1: None,
            cp2: None,
        }
    }

    /// Set Bezier control points
    pub fn with_control_points(mut self, cp1: T, cp2: T) -> Self {
        self.cp1 = Some(cp1);
        self.cp2 = Some(cp2);
        self
    }
}

/// Interpolation primitives
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Cubic Bezier from `p0` to `p3` through control points `p1`, `p2`
    pub fn bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
    }

    /// Spherical linear interpolation for quaternions.
    ///
    /// Component order does not matter as long as both inputs agree.
    pub fn slerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
        let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];

        // Take the shortest arc
        let mut b = b;
        if dot < 0.0 {
            b = [-b[0], -b[1], -b[2], -b[3]];
            dot = -dot;
        }

        if dot > 0.9995 {
            let result = [
                Self::lerp(a[0], b[0], t),
                Self::lerp(a[1], b[1], t),
                Self::lerp(a[2], b[2], t),
                Self::lerp(a[3], b[3], t),
            ];
            let len = result.iter().map(|c| c * c).sum::<f32>().sqrt();
            if len == 0.0 {
                return b;
            }
            return result.map(|c| c / len);
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta = theta.sin();
        let sin_theta_0 = theta_0.sin();

        let s0 = theta.cos() - dot * sin_theta / sin_theta_0;
        let s1 = sin_theta / sin_theta_0;

        [
            a[0] * s0 + b[0] * s1,
            a[1] * s0 + b[1] * s1,
            a[2] * s0 + b[2] * s1,
            a[3] * s0 + b[3] * s1,
        ]
    }
}

/// Ease a scalar
pub fn ease_float(t: f32, params: &EasingParameters<f32>) -> f32 {
    match (params.easing_type, params.cp1, params.cp2) {
        (EasingType::CubicBezier, Some(cp1), Some(cp2)) => {
            Interpolation::bezier(params.initial_value, cp1, cp2, params.target_value, t)
        }
        (EasingType::Linear, _, _) => {
            Interpolation::lerp(params.initial_value, params.target_value, t)
        }
        _ => params.target_value,
    }
}

/// Ease a 3D vector component-wise
pub fn ease_float3(t: f32, params: &EasingParameters<[f32; 3]>) -> [f32; 3] {
    match (params.easing_type, params.cp1, params.cp2) {
        (EasingType::CubicBezier, Some(cp1), Some(cp2)) => std::array::from_fn(|i| {
            Interpolation::bezier(params.initial_value[i], cp1[i], cp2[i], params.target_value[i], t)
        }),
        (EasingType::Linear, _, _) => std::array::from_fn(|i| {
            Interpolation::lerp(params.initial_value[i], params.target_value[i], t)
        }),
        _ => params.target_value,
    }
}

/// Ease an orientation quaternion stored scalar first (`[w, x, y, z]`).
///
/// Only spherical easing applies; every other kind snaps to the target.
pub fn ease_float4(t: f32, params: &EasingParameters<[f32; 4]>) -> [f32; 4] {
    match params.easing_type {
        EasingType::Spherical => {
            Interpolation::slerp(params.initial_value, params.target_value, t)
        }
        _ => params.target_value,
    }
}

/// An easing of one of the supported value shapes
#[derive(Debug, Clone, PartialEq)]
pub enum EasingCurve {
    /// Scalar property
    Float(EasingParameters<f32>),
    /// Vector property
    Float3(EasingParameters<[f32; 3]>),
    /// Orientation property
    Float4(EasingParameters<[f32; 4]>),
}

impl EasingCurve {
    /// Build a curve from untyped endpoints. Returns `None` when the value
    /// shape is not animatable or the endpoints disagree.
    pub fn from_values(
        easing_type: EasingType,
        initial: &Value,
        target: &Value,
        cp1: Option<&Value>,
        cp2: Option<&Value>,
    ) -> Option<Self> {
        match (initial, target) {
            (Value::Float(a), Value::Float(b)) => Some(Self::Float(EasingParameters {
                easing_type,
                initial_value: *a,
                target_value: *b,
                cp1: cp1.and_then(Value::as_float),
                cp2: cp2.and_then(Value::as_float),
            })),
            (Value::Float3(a), Value::Float3(b)) => Some(Self::Float3(EasingParameters {
                easing_type,
                initial_value: *a,
                target_value: *b,
                cp1: cp1.and_then(Value::as_float3),
                cp2: cp2.and_then(Value::as_float3),
            })),
            (Value::Float4(a), Value::Float4(b)) => Some(Self::Float4(EasingParameters {
                easing_type,
                initial_value: *a,
                target_value: *b,
                cp1: cp1.and_then(Value::as_float4),
                cp2: cp2.and_then(Value::as_float4),
            })),
            _ => None,
        }
    }

    /// Value at progress `t`
    pub fn sample(&self, t: f32) -> Value {
        match self {
            Self::Float(p) => Value::Float(ease_float(t, p)),
            Self::Float3(p) => Value::Float3(ease_float3(t, p)),
            Self::Float4(p) => Value::Float4(ease_float4(t, p)),
        }
    }

    /// Exact final value
    pub fn target(&self) -> Value {
        match self {
            Self::Float(p) => Value::Float(p.target_value),
            Self::Float3(p) => Value::Float3(p.target_value),
            Self::Float4(p) => Value::Float4(p.target_value),
        }
    }

    /// Type of the animated value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Float,
            Self::Float3(_) => ValueType::Float3,
            Self::Float4(_) => ValueType::Float4,
        }
    }
}
