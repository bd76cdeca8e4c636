//! WAV file recorder
//!
//! Writes rendered output to mono 32-bit float WAV files, and records
//! scripted performances offline.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tracing::{debug, warn};

use super::{Engine, Performance};

/// Summary of a finished recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recording {
    pub samples: u64,
    pub seconds: f64,
    /// Largest absolute sample value written
    pub peak: f32,
}

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
    peak: f32,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
            peak: 0.0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Duration recorded so far in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Write a buffer of samples
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;
            self.peak = self.peak.max(sample.abs());
        }
        self.samples_written += buffer.len() as u64;
        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<Recording> {
        let recording = Recording {
            samples: self.samples_written,
            seconds: self.duration_secs(),
            peak: self.peak,
        };
        self.writer.finalize().context("failed to finalize WAV file")?;
        if recording.peak > 1.0 {
            warn!(peak = recording.peak, "recording clipped");
        }
        Ok(recording)
    }
}

/// Render `performance` through `engine` into a WAV file at `path`.
///
/// Clearing `running` cuts the score short; the release tail is still
/// written and the file is always finalized.
pub fn record_performance(
    performance: &Performance,
    engine: &mut Engine,
    path: &Path,
    running: &AtomicBool,
) -> Result<Recording> {
    let sample_rate = engine.context().sample_rate().round() as u32;
    let mut recorder = Recorder::new(path, sample_rate)?;

    let frames = performance.render_with(engine, running, |block| recorder.write_buffer(block))?;
    debug!(frames, path = %path.display(), "performance rendered");

    recorder.finalize()
}
