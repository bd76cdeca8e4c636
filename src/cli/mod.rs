//! CLI interface for keysynth

use clap::{Parser, Subcommand};
use keysynth::synth::{SynthesisMode, Waveform};
use std::path::PathBuf;

/// Play the computer keyboard as a polyphonic synthesizer
#[derive(Parser)]
#[command(name = "keysynth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play live from the terminal keyboard
    Play {
        /// Configuration file path (defaults apply if it does not exist)
        #[arg(short, long, default_value = "keysynth.yaml")]
        config: PathBuf,
    },

    /// Render a scripted performance to a WAV file
    Record {
        /// Configuration file path (defaults apply if it does not exist)
        #[arg(short, long, default_value = "keysynth.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Space-separated chords of keys; '.' rests, digits switch waveform or mode
        #[arg(short, long, default_value = "S D F G H J K L")]
        score: String,

        /// Seconds each chord is held
        #[arg(long, default_value = "0.4")]
        note_length: f64,

        /// Seconds of silence after each chord
        #[arg(long, default_value = "0.1")]
        gap: f64,

        /// Synthesis mode (simple, additive, am, fm)
        #[arg(short, long)]
        mode: Option<SynthesisMode>,

        /// Waveform for every oscillator (sine, square, sawtooth, triangle)
        #[arg(short, long)]
        waveform: Option<Waveform>,
    },

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "keysynth.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
