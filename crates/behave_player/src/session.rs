// SPDX-License-Identifier: MIT OR Apache-2.0
//! Play session: drives a behavior engine against the simulated scene.
//!
//! Host frames are split into fixed simulation steps. Each step advances
//! engine time, then fires the scripted events and picks that have come
//! due.

use crate::config::{PlayerConfig, ScriptedEvent, ScriptedSelection};
use crate::error::PlayerError;
use crate::scene::Scene;
use behave_engine::graph::CustomEventDescriptor;
use behave_engine::nodes::custom_event;
use behave_engine::{BehaviorEngine, CustomEvent, EngineError, GraphPayload, NodeKind, Selection};
use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Steps run in one host frame before the backlog is dropped
const MAX_STEPS_PER_FRAME: u32 = 8;

/// Outcome of a finished session
#[derive(Debug)]
pub struct SessionSummary {
    /// Host frames processed
    pub frames: u64,
    /// Simulated seconds
    pub elapsed: f64,
    /// Custom events the graph sent
    pub sent_events: Vec<CustomEvent>,
    /// Runtime errors recorded by the engine
    pub errors: Vec<EngineError>,
}

/// A running graph with its scene and script
pub struct PlaySession {
    engine: BehaviorEngine,
    scene: Rc<RefCell<Scene>>,
    sent_events: Rc<RefCell<Vec<CustomEvent>>>,
    events: VecDeque<ScriptedEvent>,
    selections: VecDeque<ScriptedSelection>,
    fixed_timestep: f64,
    time_scale: f32,
    accumulated_time: f64,
    elapsed_time: f64,
    frame_count: u64,
}

/// Custom events some `customEvent/send` node of the graph emits
fn sent_event_descriptors(payload: &GraphPayload) -> impl Iterator<Item = &CustomEventDescriptor> {
    let mut indices: Vec<usize> = payload
        .nodes
        .iter()
        .filter(|node| node.kind == custom_event::Send::KIND)
        .filter_map(|node| {
            let entry = node.configuration.iter().find(|c| c.id == "customEvent")?;
            entry.value.as_u64().map(|index| index as usize)
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
        .into_iter()
        .filter_map(|index| payload.custom_events.get(index))
}

impl PlaySession {
    /// Build the scene, bind it and load the graph
    pub fn new(config: &PlayerConfig, payload: &GraphPayload) -> Result<Self, PlayerError> {
        let scene = Rc::new(RefCell::new(Scene::from_config(&config.scene)?));
        let mut engine = BehaviorEngine::new(config.engine.clone());
        Scene::bind(&scene, &mut engine);

        let sent_events = Rc::new(RefCell::new(Vec::new()));
        for descriptor in sent_event_descriptors(payload) {
            let sink = Rc::clone(&sent_events);
            let name = format!("{}{}", config.engine.event_prefix, descriptor.id);
            engine.add_custom_event_listener(name, move |event: &CustomEvent| {
                tracing::debug!("Graph sent {}", event.name);
                sink.borrow_mut().push(event.clone());
            });
        }

        let mut events: Vec<_> = config.events.clone();
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        let mut selections: Vec<_> = config.selections.clone();
        selections.sort_by(|a, b| a.at.total_cmp(&b.at));

        let mut session = Self {
            engine,
            scene,
            sent_events,
            events: events.into(),
            selections: selections.into(),
            fixed_timestep: config.fixed_timestep(),
            time_scale: 1.0,
            accumulated_time: 0.0,
            elapsed_time: 0.0,
            frame_count: 0,
        };
        session.set_time_scale(config.time_scale);
        session.engine.load_graph(payload)?;
        tracing::info!(
            "Play session started: {} scene nodes, {} scripted events, {} scripted picks",
            session.scene.borrow().len(),
            session.events.len(),
            session.selections.len()
        );
        Ok(session)
    }

    /// Engine being driven
    pub fn engine(&self) -> &BehaviorEngine {
        &self.engine
    }

    /// Current scene state
    pub fn scene(&self) -> Ref<'_, Scene> {
        self.scene.borrow()
    }

    /// Simulated seconds since the session started
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Set time scale (clamped to a reasonable range)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.clamp(0.0, 10.0) } else { 1.0 };
    }

    /// Process one host frame. Returns the number of fixed steps run.
    pub fn advance(&mut self, delta_time: f64) -> u32 {
        let scaled_delta = delta_time * f64::from(self.time_scale);
        self.accumulated_time += scaled_delta;
        self.frame_count += 1;

        let mut steps = 0;
        while self.accumulated_time >= self.fixed_timestep {
            self.accumulated_time -= self.fixed_timestep;
            self.step();
            steps += 1;

            if steps >= MAX_STEPS_PER_FRAME {
                self.accumulated_time = 0.0;
                break;
            }
        }
        steps
    }

    /// Process `frames` host frames of `delta_time` seconds each
    pub fn run(&mut self, frames: u64, delta_time: f64) {
        for _ in 0..frames {
            self.advance(delta_time);
        }
    }

    fn step(&mut self) {
        self.elapsed_time += self.fixed_timestep;
        self.engine.update(Duration::from_secs_f64(self.fixed_timestep));

        while self.events.front().is_some_and(|e| e.at <= self.elapsed_time) {
            let Some(scripted) = self.events.pop_front() else {
                break;
            };
            let name = format!("{}{}", self.engine.config().event_prefix, scripted.event);
            tracing::debug!("Emitting {} at {:.3}s", name, self.elapsed_time);
            self.engine.emit_custom_event(name, scripted.payload);
        }

        while self.selections.front().is_some_and(|s| s.at <= self.elapsed_time) {
            let Some(scripted) = self.selections.pop_front() else {
                break;
            };
            self.select(scripted.node, scripted.location);
        }
    }

    /// Report a pick of `node`, bubbling it up the scene hierarchy until a
    /// selection handler stops it. Returns the scene nodes notified.
    pub fn select(&mut self, node: usize, location: [f32; 3]) -> Vec<usize> {
        let selection = Selection {
            hit_node: node,
            local_hit_location: location,
        };
        let mut notified = Vec::new();
        let mut current = Some(node);
        while let Some(scene_node) = current {
            notified.push(scene_node);
            if !self.engine.select_node(scene_node, selection) {
                break;
            }
            current = self.scene.borrow().parent(scene_node);
        }
        tracing::debug!("Pick of scene node {} reached {:?}", node, notified);
        notified
    }

    /// End the session, logging and returning what happened
    pub fn finish(mut self) -> SessionSummary {
        let summary = SessionSummary {
            frames: self.frame_count,
            elapsed: self.elapsed_time,
            sent_events: std::mem::take(&mut *self.sent_events.borrow_mut()),
            errors: self.engine.take_errors(),
        };

        tracing::info!(
            "Play session finished after {} frames ({:.3}s simulated), {} events sent",
            summary.frames,
            summary.elapsed,
            summary.sent_events.len()
        );
        for error in &summary.errors {
            tracing::warn!("Runtime error: {error}");
        }
        self.engine.unload();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use behave_engine::{EventPayload, Value};
    use serde_json::json;

    /// receive(move) -> pointer/set `/nodes/{nodeIndex}/translation`,
    /// onSelect(node 0) -> send(picked)
    fn graph() -> GraphPayload {
        let text = json!({
            "nodes": [
                {"type": "customEvent/receive",
                 "configuration": [{"id": "customEvent", "value": 0}],
                 "flows": [{"id": "out", "node": 1}]},
                {"type": "pointer/set",
                 "configuration": [{"id": "pointer", "value": "/nodes/{nodeIndex}/translation"}],
                 "values": [
                    {"id": "nodeIndex", "node": 0, "socket": "target"},
                    {"id": "val", "node": 0, "socket": "offset"}
                 ]},
                {"type": "node/onSelect",
                 "configuration": [{"id": "nodeIndex", "value": 0}],
                 "flows": [{"id": "out", "node": 3}]},
                {"type": "customEvent/send",
                 "configuration": [{"id": "customEvent", "value": 1}],
                 "values": [{"id": "node", "node": 2, "socket": "hitNodeIndex"}]}
            ],
            "customEvents": [
                {"id": "move", "values": [
                    {"id": "target", "type": 0},
                    {"id": "offset", "type": 1}
                ]},
                {"id": "picked", "values": [{"id": "node", "type": 0}]}
            ],
            "types": [{"signature": "int"}, {"signature": "float3"}]
        })
        .to_string();
        GraphPayload::from_json(&text).unwrap()
    }

    fn config() -> PlayerConfig {
        PlayerConfig {
            fixed_timestep: 0.25,
            scene: SceneConfig {
                nodes: 3,
                parents: vec![(1, 0), (2, 1)],
            },
            ..Default::default()
        }
    }

    fn payload(entries: serde_json::Value) -> EventPayload {
        serde_json::from_value(entries).unwrap()
    }

    #[test]
    fn test_fixed_steps_and_spiral_clamp() {
        let mut session = PlaySession::new(&config(), &graph()).unwrap();
        assert_eq!(session.advance(0.5), 2);
        assert_eq!(session.advance(0.125), 0);
        assert_eq!(session.advance(0.125), 1);
        assert_eq!(session.advance(10.0), 8);
        assert_eq!(session.advance(0.0), 0);
        assert_eq!(session.elapsed_time(), 2.75);
        assert_eq!(session.engine().now(), Duration::from_millis(2750));
    }

    #[test]
    fn test_time_scale() {
        let mut session = PlaySession::new(&config(), &graph()).unwrap();
        session.set_time_scale(0.5);
        assert_eq!(session.advance(0.5), 1);
        session.set_time_scale(0.0);
        assert_eq!(session.advance(1.0), 0);
        session.set_time_scale(f32::NAN);
        assert_eq!(session.advance(0.25), 1);
    }

    #[test]
    fn test_scripted_event_moves_scene_node() {
        let mut config = config();
        config.events = vec![ScriptedEvent {
            at: 0.5,
            event: "move".to_string(),
            payload: payload(json!({"target": 2, "offset": "[1.0, 0.0, -1.0]"})),
        }];
        let mut session = PlaySession::new(&config, &graph()).unwrap();

        session.advance(0.25);
        assert_eq!(session.scene().node(2).unwrap().transform.translation, [0.0; 3]);
        session.advance(0.25);
        assert_eq!(
            session.scene().node(2).unwrap().transform.translation,
            [1.0, 0.0, -1.0]
        );
        assert!(session.finish().errors.is_empty());
    }

    #[test]
    fn test_pick_bubbles_to_root_handler() {
        let mut session = PlaySession::new(&config(), &graph()).unwrap();
        assert_eq!(session.select(2, [0.0, 1.0, 0.0]), vec![2, 1, 0]);

        let summary = session.finish();
        assert_eq!(summary.sent_events.len(), 1);
        assert_eq!(summary.sent_events[0].name, "KHR_INTERACTIVITY:picked");
        assert_eq!(summary.sent_events[0].payload["node"], json!(2));
    }

    #[test]
    fn test_scripted_pick() {
        let mut config = config();
        config.selections = vec![ScriptedSelection {
            at: 0.25,
            node: 1,
            location: [0.0; 3],
        }];
        let mut session = PlaySession::new(&config, &graph()).unwrap();
        session.run(2, 0.25);

        let summary = session.finish();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.sent_events.len(), 1);
        assert_eq!(
            summary.sent_events[0].payload["node"],
            Value::Int(1).encode_event_param()
        );
    }

    #[test]
    fn test_graph_load_failure() {
        let payload = GraphPayload::from_json(r#"{"nodes": [{"type": "nope/nope"}]}"#).unwrap();
        assert!(matches!(
            PlaySession::new(&config(), &payload),
            Err(PlayerError::Load(_))
        ));
    }
}
