//! Audio graph backend
//!
//! Oscillator, gain and constant-source nodes feeding a summing destination,
//! with parameters that accept both scheduled automation and audio-rate
//! inputs. The graph is rendered in real time by the player or offline by
//! the recorder.

mod context;
mod graph;
mod param;

pub use context::AudioContext;
pub use graph::{AudioGraph, NodeId};
pub use param::{AudioParam, ParamKind};
