//! Phase-accumulating oscillator

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    #[serde(alias = "saw")]
    Sawtooth,
    #[serde(alias = "tri")]
    Triangle,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Evaluate the waveform at a phase in `[0, 1)`
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sq" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            _ => Err(EngineError::UnknownWaveform(s.to_string())),
        }
    }
}

/// Oscillator state driven one sample at a time.
///
/// The frequency is supplied per sample so that audio-rate modulation
/// (FM, vibrato) can be applied by the caller.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Generate the next sample at the given instantaneous frequency
    pub fn generate(&mut self, frequency: f64) -> f64 {
        let sample = self.waveform.sample(self.phase);

        // Negative instantaneous frequencies (deep FM) run the phase backwards
        self.phase = (self.phase + frequency / self.sample_rate).rem_euclid(1.0);

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_oscillator() {
        let mut osc = Oscillator::new(Waveform::Sine, 44100.0);

        // First sample should be 0 (sin(0))
        let sample = osc.generate(440.0);
        assert!(sample.abs() < 0.001);
    }

    #[test]
    fn test_square_oscillator() {
        let mut osc = Oscillator::new(Waveform::Square, 4.0);

        assert_eq!(osc.generate(1.0), 1.0); // phase 0.0
        assert_eq!(osc.generate(1.0), 1.0); // phase 0.25
        assert_eq!(osc.generate(1.0), -1.0); // phase 0.5
        assert_eq!(osc.generate(1.0), -1.0); // phase 0.75
    }

    #[test]
    fn test_sawtooth_oscillator() {
        let mut osc = Oscillator::new(Waveform::Sawtooth, 4.0);

        assert_eq!(osc.generate(1.0), -1.0);
        assert_eq!(osc.generate(1.0), -0.5);
        assert_eq!(osc.generate(1.0), 0.0);
        assert_eq!(osc.generate(1.0), 0.5);
    }

    #[test]
    fn test_triangle_peaks() {
        let mut osc = Oscillator::new(Waveform::Triangle, 4.0);

        assert_eq!(osc.generate(1.0), 0.0);
        assert_eq!(osc.generate(1.0), 1.0);
        assert_eq!(osc.generate(1.0), 0.0);
        assert_eq!(osc.generate(1.0), -1.0);
    }

    #[test]
    fn test_negative_frequency_wraps_phase() {
        let mut osc = Oscillator::new(Waveform::Sawtooth, 4.0);
        osc.generate(-1.0);

        // Phase wrapped from 0.0 to 0.75
        assert_eq!(osc.generate(-1.0), 0.5);
    }

    #[test]
    fn test_waveform_parsing() {
        assert_eq!("Saw".parse::<Waveform>().unwrap(), Waveform::Sawtooth);
        assert_eq!("triangle".parse::<Waveform>().unwrap(), Waveform::Triangle);
        assert!("noise".parse::<Waveform>().is_err());
    }

    #[test]
    fn test_waveform_yaml() {
        let waveform: Waveform = serde_yaml::from_str("saw").unwrap();
        assert_eq!(waveform, Waveform::Sawtooth);
    }
}
