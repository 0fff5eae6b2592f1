// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player configuration, stored as RON next to the graph it plays.

use crate::error::PlayerError;
use behave_engine::{EngineConfig, EventPayload};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host frame rate assumed when none is configured
const DEFAULT_FRAME_DELTA: f64 = 1.0 / 60.0;

/// A custom event the player emits once simulated time reaches `at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    /// Simulated seconds since the session started
    pub at: f64,
    /// Custom event id, without the engine's event prefix
    pub event: String,
    /// Parameters in their carried form
    #[serde(default)]
    pub payload: EventPayload,
}

/// A pick of a scene node the player reports once simulated time reaches `at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedSelection {
    /// Simulated seconds since the session started
    pub at: f64,
    /// Scene node that was hit
    pub node: usize,
    /// Hit position in the node's local space
    #[serde(default)]
    pub location: [f32; 3],
}

/// Shape of the simulated scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Number of scene nodes
    pub nodes: usize,
    /// `(child, parent)` links
    pub parents: Vec<(usize, usize)>,
}

/// Settings of a play session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Graph payload (JSON). Relative paths resolve against the
    /// configuration file's directory.
    pub graph: PathBuf,
    /// Seconds per simulation step
    pub fixed_timestep: f64,
    /// Seconds of host time per frame
    pub frame_delta: f64,
    /// Host seconds to play
    pub duration: f64,
    /// Simulation speed relative to host time
    pub time_scale: f32,
    /// Simulated scene
    pub scene: SceneConfig,
    /// Scripted custom events
    pub events: Vec<ScriptedEvent>,
    /// Scripted scene picks
    pub selections: Vec<ScriptedSelection>,
    /// Engine settings
    pub engine: EngineConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            graph: PathBuf::from("graph.json"),
            fixed_timestep: DEFAULT_FRAME_DELTA,
            frame_delta: DEFAULT_FRAME_DELTA,
            duration: 1.0,
            time_scale: 1.0,
            scene: SceneConfig::default(),
            events: Vec::new(),
            selections: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, PlayerError> {
        Ok(ron::from_str(text)?)
    }

    /// Read a configuration file, resolving the graph path against the
    /// file's directory
    pub fn load(path: &Path) -> Result<Self, PlayerError> {
        let text = std::fs::read_to_string(path).map_err(|source| PlayerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_ron(&text)?;
        if config.graph.is_relative() {
            if let Some(dir) = path.parent() {
                config.graph = dir.join(&config.graph);
            }
        }
        Ok(config)
    }

    /// Seconds per simulation step, falling back to 60 Hz when unusable
    pub fn fixed_timestep(&self) -> f64 {
        positive_or_default(self.fixed_timestep)
    }

    /// Seconds per host frame, falling back to 60 Hz when unusable
    pub fn frame_delta(&self) -> f64 {
        positive_or_default(self.frame_delta)
    }

    /// Number of host frames needed to cover `duration`
    pub fn frame_count(&self) -> u64 {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return 0;
        }
        (self.duration / self.frame_delta()).ceil() as u64
    }
}

fn positive_or_default(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        DEFAULT_FRAME_DELTA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player_config() {
        let config = PlayerConfig::from_ron(
            r#"(
                graph: "door.json",
                duration: 2.0,
                frame_delta: 0.25,
                scene: (nodes: 3, parents: [(1, 0)]),
                events: [(at: 0.5, event: "open", payload: {"speed": 2.0})],
                selections: [(at: 1.0, node: 1)],
                engine: (tick_rate: 30.0),
            )"#,
        )
        .unwrap();

        assert_eq!(config.graph, PathBuf::from("door.json"));
        assert_eq!(config.scene.parents, vec![(1, 0)]);
        assert_eq!(config.events[0].payload["speed"], serde_json::json!(2.0));
        assert_eq!(config.selections[0].location, [0.0; 3]);
        assert_eq!(config.engine.tick_rate, 30.0);
        assert_eq!(config.engine.event_prefix, "KHR_INTERACTIVITY:");
        assert_eq!(config.time_scale, 1.0);
        assert_eq!(config.frame_count(), 8);
    }

    #[test]
    fn test_unusable_timestep_falls_back() {
        let config = PlayerConfig {
            fixed_timestep: 0.0,
            frame_delta: f64::NAN,
            ..Default::default()
        };
        assert_eq!(config.fixed_timestep(), DEFAULT_FRAME_DELTA);
        assert_eq!(config.frame_delta(), DEFAULT_FRAME_DELTA);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            PlayerConfig::from_ron("(duration: \"long\")"),
            Err(PlayerError::Config(_))
        ));
    }
}
