//! Scripted performances for offline rendering
//!
//! A score is a line of whitespace-separated tokens. Each token is a chord of
//! keys held together; `.` is a rest and digits switch waveform or mode
//! before the chord sounds. `"1S D 8F . SFH"` plays C4 and D4 with a sine,
//! then E4 in FM, a rest and a C major triad.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::Engine;
use crate::keymap::{self, NoteIdentity, Shortcut};

/// Frames rendered between checks of the running flag
const BLOCK_FRAMES: usize = 1024;

/// One event of a score
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keys pressed together for one note length
    Chord(Vec<NoteIdentity>),
    /// Silence for one note length
    Rest,
    /// Takes no time
    Shortcut(Shortcut),
}

/// A parsed score with its timing
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    steps: Vec<Step>,
    note_length: f64,
    gap: f64,
}

impl Performance {
    /// Parse a score. Characters that are neither keys, digits nor `.` are skipped.
    pub fn parse(score: &str, note_length: f64, gap: f64) -> Self {
        let mut steps = Vec::new();

        for token in score.split_whitespace() {
            let mut chord = Vec::new();
            for c in token.chars() {
                if c == '.' {
                    steps.push(Step::Rest);
                } else if let Some(shortcut) = keymap::shortcut(c) {
                    steps.push(Step::Shortcut(shortcut));
                } else if let Some(note) = NoteIdentity::from_char(c) {
                    if !chord.contains(&note) {
                        chord.push(note);
                    }
                } else {
                    warn!(key = %c, "skipping unmapped key in score");
                }
            }
            if !chord.is_empty() {
                steps.push(Step::Chord(chord));
            }
        }

        Self {
            steps,
            note_length: note_length.max(0.0),
            gap: gap.max(0.0),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn note_length(&self) -> f64 {
        self.note_length
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Number of chords and rests
    pub fn beats(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| !matches!(step, Step::Shortcut(_)))
            .count()
    }

    /// Length of the score itself, without the release tail
    pub fn duration(&self) -> f64 {
        self.beats() as f64 * (self.note_length + self.gap)
    }

    /// Render the whole performance, release tail included
    pub fn render(&self, engine: &mut Engine) -> Vec<f32> {
        let running = AtomicBool::new(true);
        let mut output = Vec::new();
        // The sink never fails
        let _ = self.render_with(engine, &running, |block| {
            output.extend_from_slice(block);
            Ok(())
        });
        output
    }

    /// Drive `engine` through the score, handing each rendered block to
    /// `sink`. Clearing `running` ends the performance early; the release
    /// tail still plays. Returns the number of frames rendered.
    pub fn render_with<F>(&self, engine: &mut Engine, running: &AtomicBool, mut sink: F) -> Result<usize>
    where
        F: FnMut(&[f32]) -> Result<()>,
    {
        info!(
            beats = self.beats(),
            seconds = self.duration(),
            "performance started"
        );
        let mut frames = 0;

        for step in &self.steps {
            if !running.load(Ordering::SeqCst) {
                info!("performance interrupted");
                break;
            }
            match step {
                Step::Shortcut(shortcut) => {
                    debug!(?shortcut, "score shortcut");
                    engine.control((*shortcut).into());
                }
                Step::Rest => {
                    frames += advance(engine, self.note_length + self.gap, running, &mut sink)?;
                }
                Step::Chord(notes) => {
                    for note in notes {
                        engine.key_down(*note);
                    }
                    frames += advance(engine, self.note_length, running, &mut sink)?;
                    for note in notes {
                        engine.key_up(*note);
                    }
                    frames += advance(engine, self.gap, running, &mut sink)?;
                }
            }
        }

        // Let every release finish, then tear down whatever is left
        engine.release_all();
        let settings = engine.pool().settings();
        let tail = settings.envelope.release() + settings.teardown_margin;
        let always = AtomicBool::new(true);
        frames += advance(engine, tail, &always, &mut sink)?;
        engine.shutdown();

        info!(frames, "performance finished");
        Ok(frames)
    }
}

/// Render `seconds` of audio in blocks, stopping early if `running` clears
fn advance<F>(engine: &mut Engine, seconds: f64, running: &AtomicBool, sink: &mut F) -> Result<usize>
where
    F: FnMut(&[f32]) -> Result<()>,
{
    let total = (seconds * engine.context().sample_rate()).round() as usize;
    let mut done = 0;

    while done < total && running.load(Ordering::SeqCst) {
        let block = engine.render(BLOCK_FRAMES.min(total - done));
        sink(&block)?;
        done += block.len();
    }

    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeysynthConfig;
    use crate::synth::{SynthesisMode, Waveform};

    fn note(c: char) -> NoteIdentity {
        NoteIdentity::from_char(c).unwrap()
    }

    #[test]
    fn test_parse_score() {
        let perf = Performance::parse("S d . sfh", 0.4, 0.1);
        assert_eq!(
            perf.steps(),
            &[
                Step::Chord(vec![note('S')]),
                Step::Chord(vec![note('D')]),
                Step::Rest,
                Step::Chord(vec![note('S'), note('F'), note('H')]),
            ]
        );
        assert_eq!(perf.beats(), 4);
        assert!((perf.duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_shortcuts_come_first() {
        let perf = Performance::parse("S2 8", 0.2, 0.0);
        assert_eq!(
            perf.steps(),
            &[
                Step::Shortcut(Shortcut::Waveform(Waveform::Square)),
                Step::Chord(vec![note('S')]),
                Step::Shortcut(Shortcut::Mode(SynthesisMode::Fm)),
            ]
        );
        assert_eq!(perf.beats(), 1);
    }

    #[test]
    fn test_parse_skips_unknown_and_duplicates() {
        let perf = Performance::parse("SSzx", 0.2, 0.0);
        assert_eq!(perf.steps(), &[Step::Chord(vec![note('S')])]);
    }

    #[test]
    fn test_render_length_and_teardown() {
        let mut engine = Engine::new(&KeysynthConfig::default());
        let perf = Performance::parse("S D", 0.1, 0.05);
        let samples = perf.render(&mut engine);

        // two beats of 0.15 s plus 0.35 s of tail
        assert_eq!(samples.len(), 13230 + 15435);
        assert!(samples.iter().any(|s| s.abs() > 0.01));
        assert_eq!(engine.pool().active_count(), 0);
        assert_eq!(engine.pool().pending_count(), 0);
        assert_eq!(engine.context().node_count(), 1);
    }

    #[test]
    fn test_render_applies_shortcuts() {
        let mut engine = Engine::new(&KeysynthConfig::default());
        Performance::parse("3 7 S", 0.05, 0.0).render(&mut engine);

        assert_eq!(engine.params().mode, SynthesisMode::Am);
        assert_eq!(engine.params().am.carrier, Waveform::Sawtooth);
    }

    #[test]
    fn test_interrupted_render_still_tears_down() {
        let mut engine = Engine::new(&KeysynthConfig::default());
        let perf = Performance::parse("S D F G H J K L", 0.5, 0.0);
        let running = AtomicBool::new(false);

        let frames = perf.render_with(&mut engine, &running, |_| Ok(())).unwrap();

        // Only the release tail was rendered
        assert_eq!(frames, 15435);
        assert_eq!(engine.context().node_count(), 1);
    }
}
