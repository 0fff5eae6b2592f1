// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration, stored as RON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tick rate used when none (or an unusable one) is configured
pub const DEFAULT_TICK_RATE: f32 = 60.0;

/// Prefix applied to custom event names
pub const DEFAULT_EVENT_PREFIX: &str = "KHR_INTERACTIVITY:";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The RON text could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration could not be written
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks per second for `lifecycle/onTick`
    pub tick_rate: f32,
    /// Prefix applied to custom event names on the event bus
    pub event_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            event_prefix: DEFAULT_EVENT_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Serialize to pretty RON text
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Set the tick rate
    pub fn with_tick_rate(mut self, tick_rate: f32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Time between ticks
    pub fn tick_interval(&self) -> Duration {
        let rate = if self.tick_rate.is_finite() && self.tick_rate > 0.0 {
            self.tick_rate
        } else {
            DEFAULT_TICK_RATE
        };
        Duration::from_secs_f64(1.0 / f64::from(rate))
    }
}
