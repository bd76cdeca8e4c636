//! Session engine for keysynth
//!
//! Owns the audio context, the master output gain, the parameter store and
//! the voice pool. Every key and control message enters through here.

mod controls;
mod performance;
mod player;
mod pool;
mod recorder;

pub use controls::{
    Control, Nudge, FM_INDEX_RANGE, LFO_RATE_RANGE, MODULATOR_FREQUENCY_RANGE,
    PARTIAL_COUNT_RANGE, SPREAD_RANGE,
};
pub use performance::{Performance, Step};
pub use player::{stream_buffer_size, Player};
pub use pool::{KeyDown, PoolSettings, VoiceEvent, VoicePool};
pub use recorder::{record_performance, Recorder, Recording};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::audio::{AudioContext, NodeId, ParamKind};
use crate::config::KeysynthConfig;
use crate::keymap::{self, NoteIdentity};
use crate::synth::{ParameterStore, SynthesisParameters};

/// One message from an input source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(NoteIdentity),
    KeyUp(NoteIdentity),
    Control(Control),
}

/// The keyboard synthesizer session
pub struct Engine {
    ctx: AudioContext,
    master: NodeId,
    store: ParameterStore,
    pool: VoicePool,
}

impl Engine {
    /// Create an engine rendering at the configured sample rate
    pub fn new(config: &KeysynthConfig) -> Self {
        let ctx = AudioContext::new(config.audio.sample_rate as f64);
        Self::with_context(ctx, config)
    }

    /// Create an engine on an existing audio context
    pub fn with_context(ctx: AudioContext, config: &KeysynthConfig) -> Self {
        let master = ctx.with(|graph| {
            let master = graph.create_gain(config.master.volume as f64);
            graph.connect(master, graph.destination());
            master
        });

        let settings = PoolSettings {
            budget: config.master.polyphony,
            max_volume: config.master.max_voice_volume as f64,
            envelope: config.envelope.to_envelope(),
            teardown_margin: config.envelope.teardown_margin,
        };

        Self {
            pool: VoicePool::new(ctx.clone(), master, settings),
            store: ParameterStore::new(config.synth.to_parameters()),
            ctx,
            master,
        }
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn params(&self) -> &SynthesisParameters {
        self.store.params()
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Subscribe to voice start/stop/dispose notifications
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.pool.subscribe()
    }

    /// Dispatch one input message
    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown(note) => {
                self.key_down(note);
            }
            InputEvent::KeyUp(note) => {
                self.key_up(note);
            }
            InputEvent::Control(control) => self.control(control),
        }
    }

    pub fn key_down(&mut self, note: NoteIdentity) -> KeyDown {
        self.pool.on_key_down(note, &self.store)
    }

    pub fn key_up(&mut self, note: NoteIdentity) -> bool {
        self.pool.on_key_up(note)
    }

    /// Press a character key: a mapped note starts a voice, a digit applies
    /// its shortcut. Returns `None` for everything that is not a note, so
    /// unmapped keys are dropped here and never reach the pool.
    pub fn press(&mut self, c: char) -> Option<KeyDown> {
        if let Some(note) = NoteIdentity::from_char(c) {
            return Some(self.key_down(note));
        }
        if !self.shortcut(c) {
            trace!(key = %c, "key is not on the keyboard");
        }
        None
    }

    /// Release a character key
    pub fn release(&mut self, c: char) -> bool {
        NoteIdentity::from_char(c).is_some_and(|note| self.key_up(note))
    }

    /// Apply a digit shortcut. Returns whether `c` was one.
    pub fn shortcut(&mut self, c: char) -> bool {
        match keymap::shortcut(c) {
            Some(shortcut) => {
                debug!(key = %c, ?shortcut, "shortcut");
                self.control(Control::from(shortcut));
                true
            }
            None => false,
        }
    }

    /// Apply a control change. Voices already sounding keep their parameters.
    pub fn control(&mut self, control: Control) {
        debug!(?control, "control change");
        control.apply(&mut self.store);
    }

    pub fn nudge(&mut self, nudge: Nudge) {
        let control = nudge.resolve(&self.store);
        self.control(control);
    }

    /// Set the master output level, clamped to 0.0-1.0
    pub fn set_volume(&mut self, volume: f64) {
        let master = self.master;
        let volume = volume.clamp(0.0, 1.0);
        self.ctx.with(|graph| {
            let now = graph.current_time();
            if let Some(param) = graph.param_mut(master, ParamKind::Gain) {
                param.set_value_at_time(volume, now);
            }
        });
    }

    pub fn release_all(&mut self) -> usize {
        self.pool.release_all()
    }

    /// Run teardowns whose releases have finished
    pub fn poll(&mut self) -> usize {
        self.pool.poll()
    }

    /// Release everything and tear it all down now
    pub fn shutdown(&mut self) {
        self.pool.release_all();
        self.pool.flush();
    }

    /// Render `frames` samples of output, running due teardowns afterwards
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let samples = self.ctx.render(frames);
        self.pool.poll();
        samples
    }

    pub fn render_seconds(&mut self, seconds: f64) -> Vec<f32> {
        let frames = (seconds * self.ctx.sample_rate()).round() as usize;
        self.render(frames)
    }
}
