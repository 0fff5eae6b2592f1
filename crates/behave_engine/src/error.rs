// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph loading and node evaluation.

use crate::value::ValueType;

/// Error raised while loading a graph. Nothing from the graph executes when
/// one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The payload could not be decoded
    #[error("Invalid graph payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// No node kind is registered under this name
    #[error("Unrecognized node type {kind} at node {index}")]
    UnknownNodeKind {
        /// Index of the offending node
        index: usize,
        /// Requested node kind
        kind: String,
    },

    /// A value references a node at or after its own position
    #[error("Invalid reference, node {index} references {target}")]
    ForwardReference {
        /// Index of the referencing node
        index: usize,
        /// Referenced node index
        target: usize,
    },

    /// A required value socket is not declared
    #[error("Required value {id} is missing for {node}")]
    MissingValue {
        /// Node display name
        node: String,
        /// Value id
        id: String,
    },

    /// A required flow is not declared
    #[error("Required flow {id} is missing for {node}")]
    MissingFlow {
        /// Node display name
        node: String,
        /// Flow id
        id: String,
    },

    /// A required configuration entry is not declared and has no default
    #[error("Required configuration {id} is missing and no default value was provided for {node}")]
    MissingConfiguration {
        /// Node display name
        node: String,
        /// Configuration id
        id: String,
    },

    /// A configuration entry has the wrong shape
    #[error("Invalid configuration {id} for {node}: {reason}")]
    InvalidConfiguration {
        /// Node display name
        node: String,
        /// Configuration id
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Variable definition could not be turned into a value
    #[error("Invalid variable {id}: {source}")]
    InvalidVariable {
        /// Variable id
        id: String,
        /// Underlying failure
        #[source]
        source: RuntimeError,
    },
}

/// Error raised while a node evaluates. Aborts the current work item only.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Operands of a data node do not share a type
    #[error("{node}: input types not equivalent ({left} vs {right})")]
    TypeMismatch {
        /// Node display name
        node: String,
        /// Type of the first operand
        left: ValueType,
        /// Type of the second operand
        right: ValueType,
    },

    /// The node does not support a value of this type
    #[error("{node}: invalid type {value_type}")]
    InvalidType {
        /// Node display name
        node: String,
        /// Offending type
        value_type: ValueType,
    },

    /// A raw value could not be coerced into the declared type
    #[error("Cannot coerce {raw} to {type_name}")]
    Coercion {
        /// Declared type name
        type_name: String,
        /// Raw JSON input
        raw: String,
    },

    /// The type table has no entry at this index
    #[error("Unknown type index {0}")]
    UnknownType(usize),

    /// A node asked for a value id it never declared
    #[error("{node}: unknown value {id}")]
    UnknownValue {
        /// Node display name
        node: String,
        /// Value id
        id: String,
    },

    /// The variable table has no entry at this index
    #[error("Unknown variable index {0}")]
    UnknownVariable(usize),

    /// A referenced node does not exist
    #[error("Node {0} does not exist")]
    UnknownNode(usize),

    /// A producer did not emit the requested output socket
    #[error("Node {node} has no output {socket}")]
    MissingOutput {
        /// Producer index
        node: usize,
        /// Requested socket
        socket: String,
    },

    /// A producer is already being processed further up the call chain
    #[error("Node {0} is already being evaluated")]
    ReentrantEvaluation(usize),

    /// An event payload carried a key the event schema does not declare
    #[error("Event {event} has no parameter {parameter}")]
    UnknownEventParameter {
        /// Event name
        event: String,
        /// Offending key
        parameter: String,
    },
}

/// Any error produced by the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Load-time failure
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Evaluation failure
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result type for evaluation
pub type Result<T> = std::result::Result<T, RuntimeError>;
