//! Synthesis parameters and the process-wide parameter store
//!
//! New voices snapshot the store at creation; changing it never reaches a
//! voice that is already sounding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Waveform;
use crate::error::EngineError;

/// Which strategy builds a voice's sub-graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    #[default]
    Simple,
    Additive,
    #[serde(alias = "amplitude_modulation")]
    Am,
    #[serde(alias = "frequency_modulation")]
    Fm,
}

impl SynthesisMode {
    pub fn name(&self) -> &'static str {
        match self {
            SynthesisMode::Simple => "simple",
            SynthesisMode::Additive => "additive",
            SynthesisMode::Am => "am",
            SynthesisMode::Fm => "fm",
        }
    }
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SynthesisMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(SynthesisMode::Simple),
            "additive" => Ok(SynthesisMode::Additive),
            "am" | "amplitude_modulation" => Ok(SynthesisMode::Am),
            "fm" | "frequency_modulation" => Ok(SynthesisMode::Fm),
            _ => Err(EngineError::UnknownMode(s.to_string())),
        }
    }
}

/// One harmonic component of an additive voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    /// Frequency multiple of the voice pitch (>= 1)
    pub harmonic: u32,
    /// Linear amplitude (0.0-1.0)
    pub amplitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveParams {
    pub partials: Vec<Partial>,
    pub partial_count: u32,
    pub spread: f64,
}

impl AdditiveParams {
    pub fn new(partial_count: u32, spread: f64) -> Self {
        Self {
            partials: generate_partials(partial_count, spread),
            partial_count,
            spread,
        }
    }

    /// Rebuild the partial list from the count and spread
    pub fn regenerate(&mut self) {
        self.partials = generate_partials(self.partial_count, self.spread);
    }
}

/// Harmonics `1..=count` with amplitude `1 / k^(1 + spread)`
pub fn generate_partials(count: u32, spread: f64) -> Vec<Partial> {
    (1..=count)
        .map(|harmonic| Partial {
            harmonic,
            amplitude: 1.0 / (harmonic as f64).powf(1.0 + spread),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmParams {
    pub modulator_frequency: f64,
    pub depth: f64,
    pub carrier: Waveform,
    pub modulator: Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmParams {
    pub modulator_frequency: f64,
    /// Peak deviation as a multiple of the modulator frequency
    pub index: f64,
    pub carrier: Waveform,
    pub modulator: Waveform,
}

/// Destination of the low-frequency oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoTarget {
    /// Vibrato
    #[default]
    Pitch,
    /// Tremolo
    Volume,
}

impl LfoTarget {
    pub fn toggled(&self) -> Self {
        match self {
            LfoTarget::Pitch => LfoTarget::Volume,
            LfoTarget::Volume => LfoTarget::Pitch,
        }
    }
}

impl fmt::Display for LfoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LfoTarget::Pitch => f.write_str("pitch"),
            LfoTarget::Volume => f.write_str("volume"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoParams {
    pub rate: f64,
    /// 0.0 disables the LFO
    pub depth: f64,
    pub target: LfoTarget,
}

impl LfoParams {
    pub fn is_enabled(&self) -> bool {
        self.depth > 0.0
    }
}

/// Everything a voice needs from the store, captured by value
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParameters {
    pub mode: SynthesisMode,
    pub waveform: Waveform,
    pub additive: AdditiveParams,
    pub am: AmParams,
    pub fm: FmParams,
    pub lfo: LfoParams,
}

impl Default for SynthesisParameters {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Simple,
            waveform: Waveform::Sine,
            additive: AdditiveParams::new(8, 0.0),
            am: AmParams {
                modulator_frequency: 5.0,
                depth: 0.5,
                carrier: Waveform::Sine,
                modulator: Waveform::Sine,
            },
            fm: FmParams {
                modulator_frequency: 110.0,
                index: 2.0,
                carrier: Waveform::Sine,
                modulator: Waveform::Sine,
            },
            lfo: LfoParams {
                rate: 5.0,
                depth: 0.0,
                target: LfoTarget::Pitch,
            },
        }
    }
}

/// Mutable parameter state for the session.
///
/// Values are stored as given; range clamping belongs to the controls that
/// call these setters.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: SynthesisParameters,
}

impl ParameterStore {
    pub fn new(params: SynthesisParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SynthesisParameters {
        &self.params
    }

    /// Copy of the current parameters for a new voice
    pub fn snapshot(&self) -> SynthesisParameters {
        self.params.clone()
    }

    pub fn mode(&self) -> SynthesisMode {
        self.params.mode
    }

    pub fn set_mode(&mut self, mode: SynthesisMode) {
        self.params.mode = mode;
    }

    /// Set the waveform of every mode at once
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.params.waveform = waveform;
        self.params.am.carrier = waveform;
        self.params.am.modulator = waveform;
        self.params.fm.carrier = waveform;
        self.params.fm.modulator = waveform;
    }

    pub fn set_simple_waveform(&mut self, waveform: Waveform) {
        self.params.waveform = waveform;
    }

    pub fn set_partials(&mut self, partials: Vec<Partial>) {
        self.params.additive.partial_count = partials.len() as u32;
        self.params.additive.partials = partials;
    }

    pub fn set_partial_count(&mut self, count: u32) {
        self.params.additive.partial_count = count;
        self.params.additive.regenerate();
    }

    pub fn set_partial_spread(&mut self, spread: f64) {
        self.params.additive.spread = spread;
        self.params.additive.regenerate();
    }

    pub fn set_am_modulator_frequency(&mut self, hz: f64) {
        self.params.am.modulator_frequency = hz;
    }

    pub fn set_am_depth(&mut self, depth: f64) {
        self.params.am.depth = depth;
    }

    pub fn set_am_carrier_waveform(&mut self, waveform: Waveform) {
        self.params.am.carrier = waveform;
    }

    pub fn set_am_modulator_waveform(&mut self, waveform: Waveform) {
        self.params.am.modulator = waveform;
    }

    pub fn set_fm_modulator_frequency(&mut self, hz: f64) {
        self.params.fm.modulator_frequency = hz;
    }

    pub fn set_fm_index(&mut self, index: f64) {
        self.params.fm.index = index;
    }

    pub fn set_fm_carrier_waveform(&mut self, waveform: Waveform) {
        self.params.fm.carrier = waveform;
    }

    pub fn set_fm_modulator_waveform(&mut self, waveform: Waveform) {
        self.params.fm.modulator = waveform;
    }

    pub fn set_lfo_rate(&mut self, hz: f64) {
        self.params.lfo.rate = hz;
    }

    pub fn set_lfo_depth(&mut self, depth: f64) {
        self.params.lfo.depth = depth;
    }

    pub fn set_lfo_target(&mut self, target: LfoTarget) {
        self.params.lfo.target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_partials_without_spread() {
        let partials = generate_partials(4, 0.0);

        let harmonics: Vec<u32> = partials.iter().map(|p| p.harmonic).collect();
        assert_eq!(harmonics, vec![1, 2, 3, 4]);
        assert_eq!(partials[0].amplitude, 1.0);
        assert!(partials.windows(2).all(|w| w[1].amplitude < w[0].amplitude));
    }

    #[test]
    fn test_spread_steepens_rolloff() {
        let flat = generate_partials(4, 0.0);
        let steep = generate_partials(4, 1.0);

        assert_eq!(steep[0].amplitude, 1.0);
        for (f, s) in flat.iter().zip(&steep).skip(1) {
            assert!(s.amplitude < f.amplitude);
        }
    }

    #[test]
    fn test_partial_count_regenerates() {
        let mut store = ParameterStore::default();
        store.set_partial_count(3);
        assert_eq!(store.params().additive.partials.len(), 3);

        store.set_partial_spread(0.5);
        assert_eq!(store.params().additive.partials.len(), 3);
        assert!(store.params().additive.partials[1].amplitude < 0.5);
    }

    #[test]
    fn test_set_waveform_fans_out() {
        let mut store = ParameterStore::default();
        store.set_waveform(Waveform::Square);

        let params = store.params();
        assert_eq!(params.waveform, Waveform::Square);
        assert_eq!(params.am.carrier, Waveform::Square);
        assert_eq!(params.am.modulator, Waveform::Square);
        assert_eq!(params.fm.carrier, Waveform::Square);
        assert_eq!(params.fm.modulator, Waveform::Square);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut store = ParameterStore::default();
        let before = store.snapshot();

        store.set_mode(SynthesisMode::Fm);
        store.set_fm_index(10.0);

        assert_eq!(before.mode, SynthesisMode::Simple);
        assert_eq!(before.fm.index, 2.0);
        assert_eq!(store.mode(), SynthesisMode::Fm);
    }

    #[test]
    fn test_store_accepts_unclamped_values() {
        let mut store = ParameterStore::default();
        store.set_lfo_depth(3.0);
        assert_eq!(store.params().lfo.depth, 3.0);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("FM".parse::<SynthesisMode>().unwrap(), SynthesisMode::Fm);
        assert_eq!(
            "amplitude_modulation".parse::<SynthesisMode>().unwrap(),
            SynthesisMode::Am
        );
        assert!("granular".parse::<SynthesisMode>().is_err());
    }

    #[test]
    fn test_lfo_enabled_by_depth() {
        let mut lfo = SynthesisParameters::default().lfo;
        assert!(!lfo.is_enabled());
        lfo.depth = 0.1;
        assert!(lfo.is_enabled());
        assert_eq!(lfo.target.toggled(), LfoTarget::Volume);
    }
}
