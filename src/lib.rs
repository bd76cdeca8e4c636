//! keysynth - Polyphonic terminal keyboard synthesizer
//!
//! Turns a stream of key presses and releases into concurrently sounding
//! voices. Each voice is built from oscillator and gain nodes in an
//! in-crate audio graph, shaped by an envelope and optionally modulated by
//! an LFO, and torn down once its release has finished.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod keymap;
pub mod synth;
pub mod viz;

pub use config::KeysynthConfig;
pub use engine::Engine;
pub use error::EngineError;
