//! Error types for the voice engine and its audio backend

use thiserror::Error;

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The audio output could not be acquired. Fatal for the session.
    #[error("audio backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("unknown waveform '{0}' (expected sine, square, sawtooth or triangle)")]
    UnknownWaveform(String),

    #[error("unknown synthesis mode '{0}' (expected simple, additive, am or fm)")]
    UnknownMode(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
