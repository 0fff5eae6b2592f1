// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property pointer registry.
//!
//! A prefix tree over `/`-separated segments mapping concrete property paths
//! to host getter/setter pairs. Each level holds any number of literal
//! children and at most one index child. The index child stands for every
//! integer strictly below the number used when it was registered, so
//! registering `/nodes/5/scale` serves `/nodes/0/scale` through
//! `/nodes/4/scale`.

use crate::value::Value;
use indexmap::IndexMap;

/// Reads the property at a concrete path
pub type PathGetter = Box<dyn Fn(&str) -> Value>;

/// Writes the property at a concrete path
pub type PathSetter = Box<dyn Fn(&str, Value)>;

struct PathBinding {
    getter: PathGetter,
    setter: PathSetter,
    type_name: String,
}

#[derive(Default)]
struct TrieNode {
    literals: IndexMap<String, TrieNode>,
    index: Option<IndexChild>,
    binding: Option<PathBinding>,
}

struct IndexChild {
    /// Exclusive upper bound for matched segments
    bound: u64,
    node: Box<TrieNode>,
}

/// Non-negative integer segments written in plain digits
fn numeric_segment(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<u64>().ok()
}

/// Registry of host property bindings
#[derive(Default)]
pub struct PathRegistry {
    root: TrieNode,
    bindings: usize,
}

impl PathRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter/setter pair for a path pattern.
    ///
    /// A numeric segment registers (or re-bounds) the index child of its
    /// level; an existing index child keeps its subtree.
    pub fn register(
        &mut self,
        pattern: &str,
        getter: PathGetter,
        setter: PathSetter,
        type_name: impl Into<String>,
    ) {
        let mut current = &mut self.root;
        for segment in pattern.split('/') {
            current = match numeric_segment(segment) {
                Some(bound) => {
                    let child = current.index.get_or_insert_with(|| IndexChild {
                        bound,
                        node: Box::default(),
                    });
                    if child.bound != bound {
                        tracing::debug!(
                            "Index segment re-bounded from {} to {} by {}",
                            child.bound,
                            bound,
                            pattern
                        );
                        child.bound = bound;
                    }
                    child.node.as_mut()
                }
                None => current.literals.entry(segment.to_string()).or_default(),
            };
        }

        if current.binding.is_none() {
            self.bindings += 1;
        }
        current.binding = Some(PathBinding {
            getter,
            setter,
            type_name: type_name.into(),
        });
    }

    fn traverse(&self, path: &str) -> Option<&TrieNode> {
        let mut current = &self.root;
        for segment in path.split('/') {
            current = match current.literals.get(segment) {
                Some(child) => child,
                None => {
                    let requested = numeric_segment(segment)?;
                    let index = current.index.as_ref()?;
                    if requested >= index.bound {
                        return None;
                    }
                    index.node.as_ref()
                }
            };
        }
        Some(current)
    }

    fn binding(&self, path: &str) -> Option<&PathBinding> {
        self.traverse(path).and_then(|node| node.binding.as_ref())
    }

    /// Whether a concrete path resolves to a registered binding
    pub fn is_valid(&self, path: &str) -> bool {
        self.binding(path).is_some()
    }

    /// Read the property at a concrete path
    pub fn get(&self, path: &str) -> Option<Value> {
        self.binding(path).map(|b| (b.getter)(path))
    }

    /// Write the property at a concrete path. Returns `false` when the path
    /// is invalid and nothing was written.
    pub fn set(&self, path: &str, value: Value) -> bool {
        match self.binding(path) {
            Some(binding) => {
                (binding.setter)(path, value);
                true
            }
            None => false,
        }
    }

    /// Declared type name of the property at a concrete path
    pub fn type_name(&self, path: &str) -> Option<&str> {
        self.binding(path).map(|b| b.type_name.as_str())
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.bindings
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.bindings == 0
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.bindings = 0;
    }
}

impl std::fmt::Debug for PathRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRegistry")
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn noop_binding(registry: &mut PathRegistry, pattern: &str) {
        registry.register(
            pattern,
            Box::new(|_| Value::Float(0.0)),
            Box::new(|_, _| {}),
            "float",
        );
    }

    #[test]
    fn test_index_is_exclusive_upper_bound() {
        let mut registry = PathRegistry::new();
        noop_binding(&mut registry, "/nodes/5/scale");

        assert!(registry.is_valid("/nodes/3/scale"));
        assert!(registry.is_valid("/nodes/0/scale"));
        assert!(!registry.is_valid("/nodes/5/scale"));
        assert!(!registry.is_valid("/nodes/7/scale"));
        assert!(!registry.is_valid("/nodes/three/scale"));
        assert!(!registry.is_valid("/nodes/3"));
        assert!(!registry.is_valid("/nodes/3/scale/x"));
    }

    #[test]
    fn test_index_requires_plain_non_negative_integer() {
        let mut registry = PathRegistry::new();
        noop_binding(&mut registry, "/nodes/5/scale");

        for segment in ["-1", "2.5", "1e0", "-1e300", "+1", " 1", ""] {
            let path = format!("/nodes/{segment}/scale");
            assert!(!registry.is_valid(&path), "{path} should be invalid");
        }
        assert!(registry.is_valid("/nodes/4/scale"));
    }

    #[test]
    fn test_literal_paths() {
        let mut registry = PathRegistry::new();
        noop_binding(&mut registry, "/activeCamera/position");

        assert!(registry.is_valid("/activeCamera/position"));
        assert!(!registry.is_valid("/activeCamera"));
        assert!(!registry.is_valid("/activeCamera/rotation"));
        assert_eq!(registry.type_name("/activeCamera/position"), Some("float"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_index_rebounds_and_keeps_subtree() {
        let mut registry = PathRegistry::new();
        noop_binding(&mut registry, "/nodes/99/scale");
        noop_binding(&mut registry, "/nodes/10/rotation");

        assert!(registry.is_valid("/nodes/9/scale"));
        assert!(registry.is_valid("/nodes/9/rotation"));
        assert!(!registry.is_valid("/nodes/50/scale"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_and_set_route_to_host() {
        let scales = Rc::new(RefCell::new(vec![[1.0_f32; 3]; 4]));
        let mut registry = PathRegistry::new();
        let read = Rc::clone(&scales);
        let write = Rc::clone(&scales);
        registry.register(
            "/nodes/4/scale",
            Box::new(move |path| {
                let index: usize = path.split('/').nth(2).unwrap().parse().unwrap();
                Value::Float3(read.borrow()[index])
            }),
            Box::new(move |path, value| {
                let index: usize = path.split('/').nth(2).unwrap().parse().unwrap();
                if let Some(v) = value.as_float3() {
                    write.borrow_mut()[index] = v;
                }
            }),
            "float3",
        );

        assert!(registry.set("/nodes/2/scale", Value::Float3([2.0, 3.0, 4.0])));
        assert_eq!(scales.borrow()[2], [2.0, 3.0, 4.0]);
        assert_eq!(
            registry.get("/nodes/2/scale"),
            Some(Value::Float3([2.0, 3.0, 4.0]))
        );

        assert!(!registry.set("/nodes/4/scale", Value::Float3([9.0; 3])));
        assert_eq!(registry.get("/nodes/4/scale"), None);
    }
}
