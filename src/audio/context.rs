//! Shared handle to the audio graph

use std::sync::{Arc, Mutex, MutexGuard};

use super::AudioGraph;

/// Cloneable handle used by the control thread to build and schedule the
/// graph while the output callback renders it.
#[derive(Clone)]
pub struct AudioContext {
    graph: Arc<Mutex<AudioGraph>>,
}

impl AudioContext {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            graph: Arc::new(Mutex::new(AudioGraph::new(sample_rate))),
        }
    }

    /// Run several graph operations under one lock, so they take effect
    /// between the same two rendered samples.
    pub fn with<R>(&self, f: impl FnOnce(&mut AudioGraph) -> R) -> R {
        f(&mut self.lock())
    }

    /// The shared graph, for the output callback
    pub fn graph(&self) -> Arc<Mutex<AudioGraph>> {
        self.graph.clone()
    }

    pub fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    pub fn sample_rate(&self) -> f64 {
        self.lock().sample_rate()
    }

    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.lock().set_sample_rate(sample_rate);
    }

    pub fn node_count(&self) -> usize {
        self.lock().node_count()
    }

    /// Render `frames` samples offline
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames];
        self.lock().render(&mut buffer);
        buffer
    }

    /// Render for a duration in seconds, rounded to whole samples
    pub fn render_seconds(&self, seconds: f64) -> Vec<f32> {
        let frames = (seconds * self.sample_rate()).round().max(0.0) as usize;
        self.render(frames)
    }

    fn lock(&self) -> MutexGuard<'_, AudioGraph> {
        // A panic in the audio callback must not take the control thread with it
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
