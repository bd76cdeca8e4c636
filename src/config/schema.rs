//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::synth::{
    AdditiveParams, AmParams, Envelope, FmParams, LfoParams, LfoTarget, SynthesisMode,
    SynthesisParameters, Waveform,
};

/// Main configuration for keysynth
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysynthConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Output level and polyphony
    #[serde(default)]
    pub master: MasterConfig,

    /// Amplitude envelope shared by every voice
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Initial synthesis parameters
    #[serde(default)]
    pub synth: SynthConfig,
}

impl KeysynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        // Validate master settings
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.master.max_voice_volume) {
            bail!("Max voice volume must be between 0.0 and 1.0");
        }
        if self.master.polyphony == 0 || self.master.polyphony > 64 {
            bail!("Polyphony must be between 1 and 64");
        }

        // Validate envelope
        let env = &self.envelope;
        if env.attack <= 0.0 || env.decay <= 0.0 || env.release <= 0.0 {
            bail!("Envelope attack, decay and release must be positive");
        }
        if env.release > 10.0 {
            bail!("Envelope release must be at most 10 seconds");
        }
        if env.sustain_ratio <= 0.0 || env.sustain_ratio > 1.0 {
            bail!("Sustain ratio must be in (0.0, 1.0]");
        }
        if env.teardown_margin < 0.0 {
            bail!("Teardown margin must not be negative");
        }

        // Validate synthesis defaults
        let synth = &self.synth;
        if synth.additive.partials == 0 || synth.additive.partials > 32 {
            bail!("Additive partials must be between 1 and 32");
        }
        if synth.am.modulator_frequency <= 0.0 || synth.fm.modulator_frequency <= 0.0 {
            bail!("Modulator frequencies must be positive");
        }
        if !(0.0..=1.0).contains(&synth.am.depth) {
            bail!("AM depth must be between 0.0 and 1.0");
        }
        if synth.fm.index < 0.0 {
            bail!("FM index must not be negative");
        }
        if synth.lfo.rate <= 0.0 {
            bail!("LFO rate must be positive");
        }
        if !(0.0..=1.0).contains(&synth.lfo.depth) {
            bail!("LFO depth must be between 0.0 and 1.0");
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz for offline rendering (default: 44100).
    /// Live playback follows the device rate.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Live output buffer in frames, clamped to what the device allows
    /// (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> u32 { 512 }

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Global output level 0.0-1.0 (default: 0.3)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Gain shared between simultaneous voices (default: 0.8)
    #[serde(default = "default_max_voice_volume")]
    pub max_voice_volume: f32,

    /// Maximum simultaneous voices (default: 8)
    #[serde(default = "default_polyphony")]
    pub polyphony: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            max_voice_volume: default_max_voice_volume(),
            polyphony: default_polyphony(),
        }
    }
}

fn default_volume() -> f32 { 0.3 }
fn default_max_voice_volume() -> f32 { 0.8 }
fn default_polyphony() -> usize { 8 }

/// Envelope timing in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "default_attack")]
    pub attack: f64,

    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Sustain level as a fraction of the attack peak
    #[serde(default = "default_sustain_ratio")]
    pub sustain_ratio: f64,

    #[serde(default = "default_release")]
    pub release: f64,

    /// Extra wait after the release before nodes are torn down
    #[serde(default = "default_teardown_margin")]
    pub teardown_margin: f64,
}

impl EnvelopeConfig {
    pub fn to_envelope(&self) -> Envelope {
        let mut envelope = Envelope::new();
        envelope.configure(self.attack, self.decay, self.sustain_ratio, self.release);
        envelope
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: default_attack(),
            decay: default_decay(),
            sustain_ratio: default_sustain_ratio(),
            release: default_release(),
            teardown_margin: default_teardown_margin(),
        }
    }
}

fn default_attack() -> f64 { 0.01 }
fn default_decay() -> f64 { 0.01 }
fn default_sustain_ratio() -> f64 { 0.5 }
fn default_release() -> f64 { 0.3 }
fn default_teardown_margin() -> f64 { 0.05 }

/// Synthesis parameters the session starts with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default)]
    pub mode: SynthesisMode,

    /// Applied to every mode's waveform fields
    #[serde(default)]
    pub waveform: Waveform,

    #[serde(default)]
    pub additive: AdditiveConfig,

    #[serde(default)]
    pub am: AmConfig,

    #[serde(default)]
    pub fm: FmConfig,

    #[serde(default)]
    pub lfo: LfoConfig,
}

impl SynthConfig {
    pub fn to_parameters(&self) -> SynthesisParameters {
        SynthesisParameters {
            mode: self.mode,
            waveform: self.waveform,
            additive: AdditiveParams::new(self.additive.partials, self.additive.spread),
            am: AmParams {
                modulator_frequency: self.am.modulator_frequency,
                depth: self.am.depth,
                carrier: self.waveform,
                modulator: self.waveform,
            },
            fm: FmParams {
                modulator_frequency: self.fm.modulator_frequency,
                index: self.fm.index,
                carrier: self.waveform,
                modulator: self.waveform,
            },
            lfo: LfoParams {
                rate: self.lfo.rate,
                depth: self.lfo.depth,
                target: self.lfo.target,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditiveConfig {
    #[serde(default = "default_partials")]
    pub partials: u32,

    #[serde(default)]
    pub spread: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            partials: default_partials(),
            spread: 0.0,
        }
    }
}

fn default_partials() -> u32 { 8 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmConfig {
    #[serde(default = "default_am_frequency")]
    pub modulator_frequency: f64,

    #[serde(default = "default_am_depth")]
    pub depth: f64,
}

impl Default for AmConfig {
    fn default() -> Self {
        Self {
            modulator_frequency: default_am_frequency(),
            depth: default_am_depth(),
        }
    }
}

fn default_am_frequency() -> f64 { 5.0 }
fn default_am_depth() -> f64 { 0.5 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FmConfig {
    #[serde(default = "default_fm_frequency")]
    pub modulator_frequency: f64,

    #[serde(default = "default_fm_index")]
    pub index: f64,
}

impl Default for FmConfig {
    fn default() -> Self {
        Self {
            modulator_frequency: default_fm_frequency(),
            index: default_fm_index(),
        }
    }
}

fn default_fm_frequency() -> f64 { 110.0 }
fn default_fm_index() -> f64 { 2.0 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LfoConfig {
    #[serde(default = "default_lfo_rate")]
    pub rate: f64,

    /// 0.0 disables the LFO
    #[serde(default)]
    pub depth: f64,

    #[serde(default)]
    pub target: LfoTarget,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            rate: default_lfo_rate(),
            depth: 0.0,
            target: LfoTarget::Pitch,
        }
    }
}

fn default_lfo_rate() -> f64 { 5.0 }
