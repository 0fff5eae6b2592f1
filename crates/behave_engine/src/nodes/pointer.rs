// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property pointer nodes.
//!
//! The `pointer` configuration is a path template. Every `{name}` token is a
//! value socket of the node, pulled and substituted before lookup.

use crate::animation::AnimationParameters;
use crate::context::NodeContext;
use crate::easing::{EasingCurve, EasingType};
use crate::error::{LoadError, Result, RuntimeError};
use crate::node::{BehaviorNode, NodeBase, NodeInit, NodeKind, Outputs};
use crate::value::Value;
use std::time::Duration;

/// A path with `{placeholder}` tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    template: String,
    placeholders: Vec<String>,
}

impl PathTemplate {
    /// Parse a template, collecting its placeholder names in order
    pub fn parse(template: &str) -> Self {
        let mut placeholders: Vec<String> = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            let name = &after[..close];
            if !name.is_empty() && !placeholders.iter().any(|p| p == name) {
                placeholders.push(name.to_string());
            }
            rest = &after[close + 1..];
        }
        Self {
            template: template.to_string(),
            placeholders,
        }
    }

    /// Template text
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names, without braces
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Substitute the first occurrence of each placeholder
    pub fn resolve<'a>(&self, segments: impl IntoIterator<Item = (&'a str, String)>) -> String {
        segments
            .into_iter()
            .fold(self.template.clone(), |path, (name, segment)| {
                path.replacen(&format!("{{{name}}}"), &segment, 1)
            })
    }
}

fn path_template(base: &NodeBase) -> std::result::Result<PathTemplate, LoadError> {
    let template = PathTemplate::parse(base.configuration_str("pointer")?);
    let placeholders: Vec<&str> = template.placeholders().iter().map(String::as_str).collect();
    base.require_values(&placeholders)?;
    Ok(template)
}

/// Pull the placeholder values and build the concrete path
fn resolve_path(base: &NodeBase, template: &PathTemplate, cx: &mut NodeContext<'_>) -> Result<String> {
    let mut segments = Vec::with_capacity(template.placeholders().len());
    for name in template.placeholders() {
        segments.push((name.as_str(), base.evaluate(name, cx)?.path_segment()));
    }
    Ok(template.resolve(segments))
}

fn invalid_path(base: &NodeBase, path: &str, cx: &mut NodeContext<'_>) {
    tracing::warn!("{}: invalid pointer {}", base.name(), path);
    base.continue_flow("err", cx);
}

/// Writes a property, cancelling any animation running on it
pub struct PointerSet {
    base: NodeBase,
    template: PathTemplate,
}

impl BehaviorNode for PointerSet {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        cx.clear_evaluation_cache();
        let path = resolve_path(&self.base, &self.template, cx)?;
        let value = self.base.evaluate("val", cx)?;

        if cx.is_valid_path(&path) {
            cx.cancel_animation(&path);
            cx.set_path_value(&path, value);
            self.base.continue_flow("out", cx);
        } else {
            invalid_path(&self.base, &path, cx);
        }
        Ok(Outputs::new())
    }
}

impl NodeKind for PointerSet {
    const KIND: &'static str = "pointer/set";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("PointerSet");
        base.require_values(&["val"])?;
        let template = path_template(&base)?;
        Ok(Self { base, template })
    }
}

/// Eases a property from its current value to `val` over `duration`
/// seconds. Continues `out` at once and `done` when the animation
/// completes; a replaced or cancelled animation never reaches `done`.
pub struct PointerAnimateTo {
    base: NodeBase,
    template: PathTemplate,
}

impl PointerAnimateTo {
    fn control_point(&self, id: &str, cx: &mut NodeContext<'_>) -> Result<Option<Value>> {
        if self.base.has_value(id) {
            self.base.evaluate(id, cx).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl BehaviorNode for PointerAnimateTo {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn process(&mut self, _socket: Option<&str>, cx: &mut NodeContext<'_>) -> Result<Outputs> {
        cx.clear_evaluation_cache();
        let path = resolve_path(&self.base, &self.template, cx)?;
        let target = self.base.evaluate("val", cx)?;
        let duration = self.base.evaluate("duration", cx)?;
        let easing = self.base.evaluate("easingType", cx)?;
        let cp1 = self.control_point("cp1", cx)?;
        let cp2 = self.control_point("cp2", cx)?;

        let Some(current) = cx.path_value(&path) else {
            invalid_path(&self.base, &path, cx);
            return Ok(Outputs::new());
        };

        let seconds = duration.as_float().ok_or_else(|| RuntimeError::InvalidType {
            node: self.base.name().to_string(),
            value_type: duration.value_type(),
        })?;
        let code = match easing {
            Value::Int(code) => code,
            Value::Float(code) => code as i32,
            other => {
                return Err(RuntimeError::InvalidType {
                    node: self.base.name().to_string(),
                    value_type: other.value_type(),
                })
            }
        };
        let curve = EasingCurve::from_values(
            EasingType::from_code(code),
            &current,
            &target,
            cp1.as_ref(),
            cp2.as_ref(),
        )
        .ok_or_else(|| RuntimeError::TypeMismatch {
            node: self.base.name().to_string(),
            left: current.value_type(),
            right: target.value_type(),
        })?;

        let duration = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
        let done = self.base.flow("done").filter(|f| f.node.is_some()).cloned();
        cx.animate(&path, AnimationParameters::new(curve, duration), done);
        self.base.continue_flow("out", cx);
        Ok(Outputs::new())
    }
}

impl NodeKind for PointerAnimateTo {
    const KIND: &'static str = "pointer/animateTo";

    fn create(init: &mut NodeInit<'_>) -> std::result::Result<Self, LoadError> {
        let base = init.base("PointerAnimateTo");
        base.require_values(&["val", "duration", "easingType"])?;
        let template = path_template(&base)?;
        Ok(Self { base, template })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BehaviorEngine;
    use crate::events::EventPayload;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_template_placeholders() {
        let template = PathTemplate::parse("/nodes/{nodeIndex}/scale");
        assert_eq!(template.placeholders(), ["nodeIndex".to_string()]);
        assert_eq!(
            template.resolve([("nodeIndex", "2".to_string())]),
            "/nodes/2/scale"
        );

        let template = PathTemplate::parse("/a/{x}/b/{y}/{x}/{}");
        assert_eq!(template.placeholders(), ["x".to_string(), "y".to_string()]);
        assert_eq!(
            template.resolve([("x", "1".to_string()), ("y", "2".to_string())]),
            "/a/1/b/2/{x}/{}"
        );
        assert!(PathTemplate::parse("/plain/path").placeholders().is_empty());
    }

    fn scene_scales(engine: &mut BehaviorEngine, count: usize) -> Rc<RefCell<Vec<[f32; 3]>>> {
        let scales = Rc::new(RefCell::new(vec![[1.0_f32; 3]; count]));
        let read = Rc::clone(&scales);
        let write = Rc::clone(&scales);
        let index_of = |path: &str| -> Option<usize> { path.split('/').nth(2)?.parse().ok() };
        engine.register_path(
            &format!("/nodes/{count}/scale"),
            Box::new(move |path| {
                let scales = read.borrow();
                Value::Float3(index_of(path).and_then(|i| scales.get(i).copied()).unwrap_or_default())
            }),
            Box::new(move |path, value| {
                if let (Some(i), Some(v)) = (index_of(path), value.as_float3()) {
                    if let Some(slot) = write.borrow_mut().get_mut(i) {
                        *slot = v;
                    }
                }
            }),
            "float3",
        );
        scales
    }

    fn set_graph(node_index: i32) -> String {
        json!({
            "nodes": [
                {"type": "pointer/set",
                 "configuration": [{"id": "pointer", "value": "/nodes/{nodeIndex}/scale"}],
                 "values": [
                    {"id": "nodeIndex", "value": node_index, "type": 0},
                    {"id": "val", "value": [2.0, 2.0, 2.0], "type": 1}
                 ],
                 "flows": [{"id": "err", "node": 2}]},
                {"type": "lifecycle/onStart", "flows": [{"id": "out", "node": 0}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "failed", "value": true, "type": 2}]}
            ],
            "variables": [{"id": "failed", "type": 2, "value": false}],
            "types": [{"signature": "int"}, {"signature": "float3"}, {"signature": "bool"}]
        })
        .to_string()
    }

    #[test]
    fn test_pointer_set_writes_resolved_path() {
        let mut engine = BehaviorEngine::default();
        let scales = scene_scales(&mut engine, 3);
        engine.load_graph_json(&set_graph(1)).unwrap();

        assert_eq!(scales.borrow()[1], [2.0; 3]);
        assert_eq!(scales.borrow()[0], [1.0; 3]);
        assert_eq!(engine.variable("failed"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_pointer_set_invalid_path_takes_err() {
        let mut engine = BehaviorEngine::default();
        let scales = scene_scales(&mut engine, 3);
        engine.load_graph_json(&set_graph(3)).unwrap();

        assert_eq!(*scales.borrow(), vec![[1.0; 3]; 3]);
        assert_eq!(engine.variable("failed"), Some(&Value::Bool(true)));
        assert!(engine.take_errors().is_empty());
    }

    #[test]
    fn test_pointer_set_requires_placeholder_values() {
        let mut engine = BehaviorEngine::default();
        let graph = json!({
            "nodes": [
                {"type": "pointer/set",
                 "configuration": [{"id": "pointer", "value": "/nodes/{nodeIndex}/scale"}],
                 "values": [{"id": "val", "value": [2.0, 2.0, 2.0], "type": 0}]}
            ],
            "types": [{"signature": "float3"}]
        })
        .to_string();
        assert!(matches!(
            engine.load_graph_json(&graph),
            Err(LoadError::MissingValue { id, .. }) if id == "nodeIndex"
        ));
    }

    #[test]
    fn test_animate_to_eases_and_continues_done() {
        let mut engine = BehaviorEngine::default();
        let scales = scene_scales(&mut engine, 2);
        let graph = json!({
            "nodes": [
                {"type": "pointer/animateTo",
                 "configuration": [{"id": "pointer", "value": "/nodes/{i}/scale"}],
                 "values": [
                    {"id": "i", "value": 0, "type": 0},
                    {"id": "val", "value": [3.0, 3.0, 3.0], "type": 1},
                    {"id": "duration", "value": 1.0, "type": 2},
                    {"id": "easingType", "value": 2, "type": 0}
                 ],
                 "flows": [{"id": "done", "node": 1}]},
                {"type": "variable/set",
                 "configuration": [{"id": "variable", "value": 0}],
                 "values": [{"id": "finished", "value": true, "type": 3}]},
                {"type": "customEvent/receive",
                 "configuration": [{"id": "customEvent", "value": 0}],
                 "flows": [{"id": "out", "node": 0}]}
            ],
            "variables": [{"id": "finished", "type": 3, "value": false}],
            "customEvents": [{"id": "grow", "values": []}],
            "types": [
                {"signature": "int"}, {"signature": "float3"},
                {"signature": "float"}, {"signature": "bool"}
            ]
        })
        .to_string();
        engine.load_graph_json(&graph).unwrap();
        engine.emit_custom_event("KHR_INTERACTIVITY:grow", EventPayload::new());
        assert!(engine.is_animating("/nodes/0/scale"));

        engine.update(Duration::from_millis(500));
        assert_eq!(scales.borrow()[0], [2.0; 3]);
        assert_eq!(engine.variable("finished"), Some(&Value::Bool(false)));

        engine.update(Duration::from_millis(500));
        assert_eq!(scales.borrow()[0], [3.0; 3]);
        assert!(!engine.is_animating("/nodes/0/scale"));
        assert_eq!(engine.variable("finished"), Some(&Value::Bool(true)));
    }
}
