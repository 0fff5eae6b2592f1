// SPDX-License-Identifier: MIT OR Apache-2.0
//! Simulated scene the player binds to the engine's property pointers.

use crate::config::SceneConfig;
use crate::error::PlayerError;
use behave_engine::{BehaviorEngine, Value};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Local transform of a scene node. Rotation is a scalar-first quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position
    pub translation: [f32; 3],
    /// Orientation `[w, x, y, z]`
    pub rotation: [f32; 4],
    /// Scale
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            scale: [1.0; 3],
        }
    }
}

/// A node of the scene hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    /// Local transform
    pub transform: Transform,
    /// Parent node, if any
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum NodeProperty {
    Translation,
    Rotation,
    Scale,
}

impl NodeProperty {
    const ALL: [Self; 3] = [Self::Translation, Self::Rotation, Self::Scale];

    fn segment(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Self::Rotation => "float4",
            Self::Translation | Self::Scale => "float3",
        }
    }

    fn read(self, transform: &Transform) -> Value {
        match self {
            Self::Translation => Value::Float3(transform.translation),
            Self::Rotation => Value::Float4(transform.rotation),
            Self::Scale => Value::Float3(transform.scale),
        }
    }

    fn write(self, transform: &mut Transform, value: &Value) -> bool {
        match (self, value) {
            (Self::Translation, Value::Float3(v)) => transform.translation = *v,
            (Self::Rotation, Value::Float4(v)) => transform.rotation = *v,
            (Self::Scale, Value::Float3(v)) => transform.scale = *v,
            _ => return false,
        }
        true
    }
}

/// `/nodes/{index}/...` -> index
fn node_index(path: &str) -> Option<usize> {
    path.split('/').nth(2)?.parse().ok()
}

/// Scene nodes, active camera and material variant
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    /// Position of the active camera
    pub camera_position: [f32; 3],
    /// Selected material variant
    pub variant: i32,
}

impl Scene {
    /// Create a flat scene of `count` nodes with identity transforms
    pub fn new(count: usize) -> Self {
        Self {
            nodes: vec![SceneNode::default(); count],
            camera_position: [0.0; 3],
            variant: 0,
        }
    }

    /// Build a scene, rejecting parent links that are out of range or cyclic
    pub fn from_config(config: &SceneConfig) -> Result<Self, PlayerError> {
        let mut scene = Self::new(config.nodes);
        for &(child, parent) in &config.parents {
            let invalid = PlayerError::InvalidParent { child, parent };
            if child >= scene.nodes.len() || parent >= scene.nodes.len() {
                return Err(invalid);
            }
            if child == parent || scene.ancestors(parent).any(|a| a == child) {
                return Err(invalid);
            }
            scene.nodes[child].parent = Some(parent);
        }
        Ok(scene)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by index
    pub fn node(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    /// Parent of a node
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.parent)
    }

    /// Parents of a node, nearest first
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent(index), |&i| self.parent(i)).take(self.nodes.len())
    }

    /// Bind every scene property to a path on the engine:
    /// `/nodes/{n}/translation|rotation|scale`, `/activeCamera/position`
    /// and `/KHR_materials_variants/variant`
    pub fn bind(scene: &Rc<RefCell<Scene>>, engine: &mut BehaviorEngine) {
        let count = scene.borrow().len();
        if count > 0 {
            for property in NodeProperty::ALL {
                let read = Rc::clone(scene);
                let write = Rc::clone(scene);
                engine.register_path(
                    &format!("/nodes/{count}/{}", property.segment()),
                    Box::new(move |path: &str| {
                        let scene = read.borrow();
                        node_index(path)
                            .and_then(|i| scene.nodes.get(i))
                            .map_or_else(|| property.read(&Transform::default()), |n| property.read(&n.transform))
                    }),
                    Box::new(move |path: &str, value: Value| {
                        let mut scene = write.borrow_mut();
                        let Some(node) = node_index(path).and_then(|i| scene.nodes.get_mut(i)) else {
                            return;
                        };
                        if !property.write(&mut node.transform, &value) {
                            tracing::warn!("Ignoring {} write of {}", path, value.value_type().name());
                        }
                    }),
                    property.type_name(),
                );
            }
        }

        let read = Rc::clone(scene);
        let write = Rc::clone(scene);
        engine.register_path(
            "/activeCamera/position",
            Box::new(move |_: &str| Value::Float3(read.borrow().camera_position)),
            Box::new(move |path: &str, value: Value| match value.as_float3() {
                Some(position) => write.borrow_mut().camera_position = position,
                None => tracing::warn!("Ignoring {} write of {}", path, value.value_type().name()),
            }),
            "float3",
        );

        let read = Rc::clone(scene);
        let write = Rc::clone(scene);
        engine.register_path(
            "/KHR_materials_variants/variant",
            Box::new(move |_: &str| Value::Int(read.borrow().variant)),
            Box::new(move |path: &str, value: Value| match value.as_int() {
                Some(variant) => write.borrow_mut().variant = variant,
                None => tracing::warn!("Ignoring {} write of {}", path, value.value_type().name()),
            }),
            "int",
        );
    }
}
