// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry mapping node kind names to factories.

use crate::error::LoadError;
use crate::node::{BehaviorNode, NodeInit, NodeKind};

/// Builds a node instance from its declaration
pub type NodeFactory =
    Box<dyn Fn(&mut NodeInit<'_>) -> Result<Box<dyn BehaviorNode>, LoadError>>;

/// Registry of node kinds
pub struct NodeRegistry {
    /// Registered factories by kind
    factories: indexmap::IndexMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: indexmap::IndexMap::new(),
        }
    }

    /// Register a factory, replacing any factory registered under `kind`
    pub fn register(&mut self, kind: impl Into<String>, factory: NodeFactory) {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            tracing::warn!("Node kind {} re-registered, previous factory replaced", kind);
        }
    }

    /// Register a node kind under its well-known name
    pub fn register_kind<T: NodeKind>(&mut self) {
        self.register(
            T::KIND,
            Box::new(
                |init: &mut NodeInit<'_>| -> Result<Box<dyn BehaviorNode>, LoadError> {
                    Ok(Box::new(T::create(init)?))
                },
            ),
        );
    }

    /// Whether a kind is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names, in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create a node for its declared kind
    pub fn create_node(&self, init: &mut NodeInit<'_>) -> Result<Box<dyn BehaviorNode>, LoadError> {
        let kind = &init.definition.kind;
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| LoadError::UnknownNodeKind {
                index: init.index,
                kind: kind.clone(),
            })?;
        factory(init)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GraphContext;
    use crate::graph::NodeDefinition;
    use crate::node::{NodeBase, Subscriptions};

    struct Marker {
        base: NodeBase,
    }

    impl BehaviorNode for Marker {
        fn base(&self) -> &NodeBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut NodeBase {
            &mut self.base
        }
    }

    impl NodeKind for Marker {
        const KIND: &'static str = "test/marker";

        fn create(init: &mut NodeInit<'_>) -> Result<Self, LoadError> {
            Ok(Self {
                base: init.base("Marker"),
            })
        }
    }

    #[test]
    fn test_create_registered_kind() {
        let mut registry = NodeRegistry::new();
        registry.register_kind::<Marker>();
        assert!(registry.contains("test/marker"));

        let graph = GraphContext::default();
        let definition = NodeDefinition::new("test/marker");
        let mut subscriptions = Subscriptions::default();
        let mut init = NodeInit::new(4, &definition, &graph, &mut subscriptions);
        let node = registry.create_node(&mut init).unwrap();
        assert_eq!(node.base().index(), 4);
        assert_eq!(node.base().kind(), "test/marker");
    }

    #[test]
    fn test_unknown_kind() {
        let registry = NodeRegistry::new();
        let graph = GraphContext::default();
        let definition = NodeDefinition::new("nope/nothing");
        let mut subscriptions = Subscriptions::default();
        let mut init = NodeInit::new(2, &definition, &graph, &mut subscriptions);
        assert!(matches!(
            registry.create_node(&mut init),
            Err(LoadError::UnknownNodeKind { index: 2, .. })
        ));
    }
}
