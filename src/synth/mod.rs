//! Voice synthesis
//!
//! Contains the oscillator, envelope, synthesis parameters, the four
//! synthesis strategies and the voice itself.

mod envelope;
mod oscillator;
mod params;
mod strategy;
mod voice;

pub use envelope::{Envelope, RELEASE_FLOOR, START_LEVEL};
pub use oscillator::{Oscillator, Waveform};
pub use params::{
    generate_partials, AdditiveParams, AmParams, FmParams, LfoParams, LfoTarget, ParameterStore,
    Partial, SynthesisMode, SynthesisParameters,
};
pub use strategy::{Strategy, SubGraph, VoiceNode};
pub use voice::{Disposal, Voice, VoicePhase, VIBRATO_RANGE};
