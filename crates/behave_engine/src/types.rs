// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type table declared by a graph.

use crate::error::{Result, RuntimeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Signature marking a type whose real name lives in its extensions
pub const CUSTOM_SIGNATURE: &str = "custom";

/// One entry of the graph type table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Declared signature (`bool`, `float3`, `custom`, ...)
    pub signature: String,
    /// Extension data; for custom types the first key is the type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<IndexMap<String, serde_json::Value>>,
}

impl TypeDefinition {
    /// Create a plain type entry
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            extensions: None,
        }
    }

    /// Create a custom type entry resolved through an extension key
    pub fn custom(extension: impl Into<String>) -> Self {
        let mut extensions = IndexMap::new();
        extensions.insert(extension.into(), serde_json::Value::Object(Default::default()));
        Self {
            signature: CUSTOM_SIGNATURE.to_string(),
            extensions: Some(extensions),
        }
    }

    /// Semantic name of this type
    pub fn resolved_name(&self) -> &str {
        if self.signature == CUSTOM_SIGNATURE {
            if let Some((name, _)) = self.extensions.as_ref().and_then(|ext| ext.first()) {
                return name;
            }
        }
        &self.signature
    }
}

/// Index-addressed type table shared by every node of a graph
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    entries: Vec<TypeDefinition>,
}

impl TypeTable {
    /// Create a table from the graph's type list
    pub fn new(entries: Vec<TypeDefinition>) -> Self {
        Self { entries }
    }

    /// Resolve a type index to its semantic type name
    pub fn type_name(&self, index: usize) -> Result<&str> {
        self.entries
            .get(index)
            .map(TypeDefinition::resolved_name)
            .ok_or(RuntimeError::UnknownType(index))
    }

    /// First index whose semantic name equals `name`
    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|t| t.resolved_name() == name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
