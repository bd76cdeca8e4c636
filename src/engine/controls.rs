//! Control-change messages
//!
//! Sliders, buttons and shortcuts all land here. Values are clamped to their
//! documented ranges before they reach the parameter store.

use crate::keymap::Shortcut;
use crate::synth::{LfoTarget, ParameterStore, SynthesisMode, Waveform};

pub const MODULATOR_FREQUENCY_RANGE: (f64, f64) = (0.1, 2000.0);
pub const FM_INDEX_RANGE: (f64, f64) = (0.0, 50.0);
pub const LFO_RATE_RANGE: (f64, f64) = (0.1, 20.0);
pub const PARTIAL_COUNT_RANGE: (u32, u32) = (1, 32);
pub const SPREAD_RANGE: (f64, f64) = (0.0, 4.0);

/// One parameter change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Mode(SynthesisMode),
    /// Every waveform field at once
    Waveform(Waveform),
    SimpleWaveform(Waveform),
    PartialCount(u32),
    PartialSpread(f64),
    AmModulatorFrequency(f64),
    AmDepth(f64),
    AmCarrierWaveform(Waveform),
    AmModulatorWaveform(Waveform),
    FmModulatorFrequency(f64),
    FmIndex(f64),
    FmCarrierWaveform(Waveform),
    FmModulatorWaveform(Waveform),
    LfoRate(f64),
    LfoDepth(f64),
    LfoTarget(LfoTarget),
}

impl From<Shortcut> for Control {
    fn from(shortcut: Shortcut) -> Self {
        match shortcut {
            Shortcut::Waveform(waveform) => Control::Waveform(waveform),
            Shortcut::Mode(mode) => Control::Mode(mode),
        }
    }
}

impl Control {
    /// The same control with its value clamped to range
    pub fn clamped(self) -> Self {
        let clamp = |value: f64, (min, max): (f64, f64)| value.clamp(min, max);
        match self {
            Control::PartialCount(count) => {
                Control::PartialCount(count.clamp(PARTIAL_COUNT_RANGE.0, PARTIAL_COUNT_RANGE.1))
            }
            Control::PartialSpread(spread) => Control::PartialSpread(clamp(spread, SPREAD_RANGE)),
            Control::AmModulatorFrequency(hz) => {
                Control::AmModulatorFrequency(clamp(hz, MODULATOR_FREQUENCY_RANGE))
            }
            Control::AmDepth(depth) => Control::AmDepth(clamp(depth, (0.0, 1.0))),
            Control::FmModulatorFrequency(hz) => {
                Control::FmModulatorFrequency(clamp(hz, MODULATOR_FREQUENCY_RANGE))
            }
            Control::FmIndex(index) => Control::FmIndex(clamp(index, FM_INDEX_RANGE)),
            Control::LfoRate(hz) => Control::LfoRate(clamp(hz, LFO_RATE_RANGE)),
            Control::LfoDepth(depth) => Control::LfoDepth(clamp(depth, (0.0, 1.0))),
            other => other,
        }
    }

    /// Clamp and write into the store
    pub fn apply(self, store: &mut ParameterStore) {
        match self.clamped() {
            Control::Mode(mode) => store.set_mode(mode),
            Control::Waveform(waveform) => store.set_waveform(waveform),
            Control::SimpleWaveform(waveform) => store.set_simple_waveform(waveform),
            Control::PartialCount(count) => store.set_partial_count(count),
            Control::PartialSpread(spread) => store.set_partial_spread(spread),
            Control::AmModulatorFrequency(hz) => store.set_am_modulator_frequency(hz),
            Control::AmDepth(depth) => store.set_am_depth(depth),
            Control::AmCarrierWaveform(waveform) => store.set_am_carrier_waveform(waveform),
            Control::AmModulatorWaveform(waveform) => store.set_am_modulator_waveform(waveform),
            Control::FmModulatorFrequency(hz) => store.set_fm_modulator_frequency(hz),
            Control::FmIndex(index) => store.set_fm_index(index),
            Control::FmCarrierWaveform(waveform) => store.set_fm_carrier_waveform(waveform),
            Control::FmModulatorWaveform(waveform) => store.set_fm_modulator_waveform(waveform),
            Control::LfoRate(hz) => store.set_lfo_rate(hz),
            Control::LfoDepth(depth) => store.set_lfo_depth(depth),
            Control::LfoTarget(target) => store.set_lfo_target(target),
        }
    }
}

/// Relative adjustments used by the terminal keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    /// Depth or index of the current mode (LFO depth in simple/additive)
    AmountUp,
    AmountDown,
    /// Modulator frequency of the current mode (LFO rate in simple/additive)
    RateUp,
    RateDown,
    PartialsUp,
    PartialsDown,
    LfoDepthUp,
    LfoDepthDown,
    LfoTargetToggle,
}

impl Nudge {
    /// The absolute control this nudge amounts to, given the current store
    pub fn resolve(self, store: &ParameterStore) -> Control {
        let params = store.params();
        let up = matches!(
            self,
            Nudge::AmountUp | Nudge::RateUp | Nudge::PartialsUp | Nudge::LfoDepthUp
        );
        let step = if up { 1.0 } else { -1.0 };
        let ratio = if up { 1.25 } else { 0.8 };

        match self {
            Nudge::AmountUp | Nudge::AmountDown => match params.mode {
                SynthesisMode::Am => Control::AmDepth(params.am.depth + 0.1 * step),
                SynthesisMode::Fm => Control::FmIndex(params.fm.index + 0.5 * step),
                SynthesisMode::Simple | SynthesisMode::Additive => {
                    Control::LfoDepth(params.lfo.depth + 0.1 * step)
                }
            },
            Nudge::RateUp | Nudge::RateDown => match params.mode {
                SynthesisMode::Am => Control::AmModulatorFrequency(params.am.modulator_frequency * ratio),
                SynthesisMode::Fm => Control::FmModulatorFrequency(params.fm.modulator_frequency * ratio),
                SynthesisMode::Simple | SynthesisMode::Additive => Control::LfoRate(params.lfo.rate * ratio),
            },
            Nudge::PartialsUp => Control::PartialCount(params.additive.partial_count.saturating_add(1)),
            Nudge::PartialsDown => Control::PartialCount(params.additive.partial_count.saturating_sub(1)),
            Nudge::LfoDepthUp | Nudge::LfoDepthDown => Control::LfoDepth(params.lfo.depth + 0.1 * step),
            Nudge::LfoTargetToggle => Control::LfoTarget(params.lfo.target.toggled()),
        }
    }
}
