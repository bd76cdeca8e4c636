//! keysynth - Polyphonic terminal keyboard synthesizer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keysynth::config::{self, EXAMPLE_CONFIG};
use keysynth::engine::{self, Engine, Performance, Player};
use keysynth::viz;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = config::load_or_default(&config_path)?;
            let mut engine = Engine::new(&cfg);

            let mut player = Player::new();
            player
                .start(engine.context(), cfg.audio.buffer_size)
                .context("failed to start audio output")?;
            info!(
                sample_rate = engine.context().sample_rate(),
                polyphony = cfg.master.polyphony,
                "playing"
            );

            let result = viz::run(&mut engine);
            player.stop();
            result?;
        }

        Commands::Record {
            config: config_path,
            output,
            score,
            note_length,
            gap,
            mode,
            waveform,
        } => {
            let mut cfg = config::load_or_default(&config_path)?;
            if let Some(mode) = mode {
                cfg.synth.mode = mode;
            }
            if let Some(waveform) = waveform {
                cfg.synth.waveform = waveform;
            }

            let performance = Performance::parse(&score, note_length, gap);
            if performance.beats() == 0 {
                warn!("score has no notes or rests");
            }

            let running = Arc::new(AtomicBool::new(true));
            let handler_flag = running.clone();
            ctrlc::set_handler(move || {
                handler_flag.store(false, Ordering::SeqCst);
            })
            .context("failed to install Ctrl-C handler")?;

            println!(
                "Recording {:.1} seconds ({} mode, {}) to {:?}...",
                performance.duration(),
                cfg.synth.mode,
                cfg.synth.waveform,
                output
            );

            let mut engine = Engine::new(&cfg);
            let recording =
                engine::record_performance(&performance, &mut engine, &output, &running)?;

            if !running.load(Ordering::SeqCst) {
                println!("Interrupted.");
            }
            println!(
                "Recorded {:.2} s to {:?} (peak {:.2})",
                recording.seconds, output, recording.peak
            );
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {} frames", cfg.audio.buffer_size);
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    println!("  Polyphony: {}", cfg.master.polyphony);
                    println!(
                        "  Envelope: attack {}s, decay {}s, sustain {:.0}%, release {}s",
                        cfg.envelope.attack,
                        cfg.envelope.decay,
                        cfg.envelope.sustain_ratio * 100.0,
                        cfg.envelope.release
                    );
                    println!("  Mode: {}", cfg.synth.mode);
                    println!("  Waveform: {}", cfg.synth.waveform);
                    if cfg.synth.lfo.depth > 0.0 {
                        println!(
                            "  LFO: {} at {} Hz, depth {}",
                            cfg.synth.lfo.target, cfg.synth.lfo.rate, cfg.synth.lfo.depth
                        );
                    } else {
                        println!("  LFO: off");
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = "keysynth.yaml";
            if std::path::Path::new(path).exists() {
                println!("keysynth.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created keysynth.yaml with example configuration.");
            }
        }
    }

    Ok(())
}
