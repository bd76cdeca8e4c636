//! Amplitude envelope
//!
//! Attack-Decay-Sustain-Release shape, scheduled onto a gain parameter
//! rather than computed per sample.

use crate::audio::AudioParam;

/// Level the attack ramp starts from (exponential ramps cannot start at 0)
pub const START_LEVEL: f64 = 0.001;

/// Level the release ramp ends at
pub const RELEASE_FLOOR: f64 = 0.0001;

/// ADSR envelope timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    // Time parameters (in seconds)
    attack: f64,
    decay: f64,
    /// Sustain as a fraction of the attack peak (0.0-1.0)
    sustain_ratio: f64,
    release: f64,
}

impl Envelope {
    /// Create a new envelope with default parameters
    pub fn new() -> Self {
        Self {
            attack: 0.01,       // 10ms
            decay: 0.01,        // 10ms
            sustain_ratio: 0.5, // half the peak
            release: 0.3,       // 300ms
        }
    }

    /// Set attack time in seconds
    pub fn set_attack(&mut self, seconds: f64) {
        self.attack = seconds.max(0.001); // Minimum 1ms
    }

    /// Set decay time in seconds
    pub fn set_decay(&mut self, seconds: f64) {
        self.decay = seconds.max(0.001);
    }

    /// Set sustain ratio
    pub fn set_sustain_ratio(&mut self, ratio: f64) {
        self.sustain_ratio = ratio.clamp(0.001, 1.0);
    }

    /// Set release time in seconds
    pub fn set_release(&mut self, seconds: f64) {
        self.release = seconds.max(0.001);
    }

    /// Configure all parameters at once
    pub fn configure(&mut self, attack: f64, decay: f64, sustain_ratio: f64, release: f64) {
        self.set_attack(attack);
        self.set_decay(decay);
        self.set_sustain_ratio(sustain_ratio);
        self.set_release(release);
    }

    pub fn attack(&self) -> f64 {
        self.attack
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn sustain_ratio(&self) -> f64 {
        self.sustain_ratio
    }

    pub fn release(&self) -> f64 {
        self.release
    }

    /// Level held after the decay for a given attack peak
    pub fn sustain_level(&self, peak: f64) -> f64 {
        peak * self.sustain_ratio
    }

    /// Schedule attack and decay starting at `now`
    pub fn schedule_start(&self, param: &mut AudioParam, peak: f64, now: f64) {
        param.set_value_at_time(START_LEVEL, now);
        param.linear_ramp_to_value_at_time(peak, now + self.attack);
        param.exponential_ramp_to_value_at_time(
            self.sustain_level(peak),
            now + self.attack + self.decay,
        );
    }

    /// Replace pending automation with a release from the current level.
    ///
    /// Returns the time the release reaches the floor.
    pub fn schedule_release(&self, param: &mut AudioParam, now: f64) -> f64 {
        let level = param.value_at(now);
        self.schedule_release_from(param, level, now)
    }

    /// Like [`Envelope::schedule_release`], but starting from `level`
    pub fn schedule_release_from(&self, param: &mut AudioParam, level: f64, now: f64) -> f64 {
        let end = now + self.release;

        param.cancel_scheduled_values(now);
        param.set_value_at_time(level, now);
        param.exponential_ramp_to_value_at_time(RELEASE_FLOOR, end);

        end
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
