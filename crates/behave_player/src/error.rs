// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player errors.

use behave_engine::LoadError;
use std::path::PathBuf;

/// Failures that stop a play session from starting
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// A file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The player configuration is not valid RON
    #[error("Invalid player configuration: {0}")]
    Config(#[from] ron::error::SpannedError),
    /// The graph did not load
    #[error("Graph failed to load: {0}")]
    Load(#[from] LoadError),
    /// A scene parent link is out of range or forms a cycle
    #[error("Invalid parent {parent} for scene node {child}")]
    InvalidParent {
        /// Child node
        child: usize,
        /// Requested parent
        parent: usize,
    },
}
