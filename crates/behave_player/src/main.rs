// SPDX-License-Identifier: MIT OR Apache-2.0
//! Behavior graph player.
//!
//! Plays a behavior graph headlessly against a simulated scene:
//! - Scene node transforms, active camera and material variant bound as
//!   property pointers
//! - Fixed-timestep simulation with a time scale
//! - Scripted custom events and scene picks
//!
//! Usage: `behave_player [config.ron]` (defaults to `demos/player.ron`).

mod config;
mod error;
mod scene;
mod session;

use behave_engine::GraphPayload;
use config::PlayerConfig;
use error::PlayerError;
use session::PlaySession;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "demos/player.ron";

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("behave_engine=info,behave_player=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("Starting behave_player v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);

    if let Err(e) = play(&config_path) {
        tracing::error!("Player failed: {e}");
        std::process::exit(1);
    }
}

fn play(config_path: &Path) -> Result<(), PlayerError> {
    let config = PlayerConfig::load(config_path)?;
    let text = std::fs::read_to_string(&config.graph).map_err(|source| PlayerError::Io {
        path: config.graph.clone(),
        source,
    })?;
    let payload = GraphPayload::from_json(&text)?;
    tracing::info!(
        "Playing {} ({} nodes) for {:.2}s",
        config.graph.display(),
        payload.nodes.len(),
        config.duration
    );

    let mut session = PlaySession::new(&config, &payload)?;
    session.run(config.frame_count(), config.frame_delta());
    tracing::debug!(
        "Engine {} simulated {:.3}s",
        session.engine().id(),
        session.elapsed_time()
    );

    {
        let scene = session.scene();
        if scene.is_empty() {
            tracing::info!("Scene has no nodes");
        }
        for index in 0..scene.len() {
            if let Some(node) = scene.node(index) {
                tracing::info!(
                    "Node {}: translation {:?}, rotation {:?}, scale {:?}",
                    index,
                    node.transform.translation,
                    node.transform.rotation,
                    node.transform.scale
                );
            }
        }
        tracing::info!(
            "Camera at {:?}, material variant {}",
            scene.camera_position,
            scene.variant
        );
    }

    let summary = session.finish();
    for event in &summary.sent_events {
        tracing::info!("Sent {} {:?}", event.name, event.payload);
    }
    Ok(())
}
