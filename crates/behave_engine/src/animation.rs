// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property animations keyed by pointer path.
//!
//! At most one task runs per path. Starting a task on a busy path replaces
//! the running one, and a replaced or cancelled task never completes.

use crate::easing::EasingCurve;
use crate::graph::Flow;
use crate::pointer::PathRegistry;
use indexmap::IndexMap;
use std::time::Duration;

/// What happens when an animation reaches its target
pub enum Completion {
    /// Nothing
    None,
    /// Enqueue a graph flow
    Flow(Flow),
    /// Run a host callback
    Callback(Box<dyn FnOnce()>),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Flow(flow) => f.debug_tuple("Flow").field(flow).finish(),
            Self::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Curve and duration of an animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationParameters {
    /// Easing from the current value to the target
    pub curve: EasingCurve,
    /// Total running time
    pub duration: Duration,
}

impl AnimationParameters {
    /// Create parameters
    pub fn new(curve: EasingCurve, duration: Duration) -> Self {
        Self { curve, duration }
    }
}

/// A running animation
#[derive(Debug)]
pub struct AnimationTask {
    params: AnimationParameters,
    started: Duration,
    completion: Completion,
}

impl AnimationTask {
    /// Create a task starting at `started` engine time
    pub fn new(params: AnimationParameters, started: Duration, completion: Completion) -> Self {
        Self {
            params,
            started,
            completion,
        }
    }

    /// Progress in `[0, 1]` at engine time `now`
    pub fn progress(&self, now: Duration) -> f32 {
        let elapsed = now.saturating_sub(self.started);
        if self.params.duration.is_zero() || elapsed >= self.params.duration {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.params.duration.as_secs_f64()) as f32
    }
}

/// Running animations, one per path
#[derive(Debug, Default)]
pub struct Animations {
    tasks: IndexMap<String, AnimationTask>,
}

impl Animations {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a task, replacing any task already running on `path`
    pub fn start(&mut self, path: impl Into<String>, task: AnimationTask) {
        let path = path.into();
        if self.tasks.insert(path.clone(), task).is_some() {
            tracing::debug!("Replaced running animation on {}", path);
        }
    }

    /// Stop the task on `path` without completing it
    pub fn cancel(&mut self, path: &str) -> bool {
        self.tasks.shift_remove(path).is_some()
    }

    /// Stop every task whose completion continues a graph flow
    pub fn cancel_graph_tasks(&mut self) {
        self.tasks
            .retain(|_, task| !matches!(task.completion, Completion::Flow(_)));
    }

    /// Stop every task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Whether a task is running on `path`
    pub fn is_animating(&self, path: &str) -> bool {
        self.tasks.contains_key(path)
    }

    /// Number of running tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is running
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Write the eased value of every task at `now`. Finished tasks write
    /// their exact target, are removed, and hand back their completion.
    pub fn step(&mut self, now: Duration, paths: &PathRegistry) -> Vec<Completion> {
        let mut finished = Vec::new();
        self.tasks.retain(|path, task| {
            let t = task.progress(now);
            if t >= 1.0 {
                paths.set(path, task.params.curve.target());
                finished.push(std::mem::replace(&mut task.completion, Completion::None));
                false
            } else {
                paths.set(path, task.params.curve.sample(t));
                true
            }
        });
        finished
    }
}
