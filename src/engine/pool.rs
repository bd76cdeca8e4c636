//! Polyphony management
//!
//! Routes key-down/key-up to voice creation and release, enforces the
//! voice budget and runs deferred teardown when releases have finished.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::debug;

use crate::audio::{AudioContext, NodeId};
use crate::keymap::NoteIdentity;
use crate::synth::{Disposal, Envelope, ParameterStore, Voice};

/// Notifications for the visual layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    Started(NoteIdentity),
    Stopped(NoteIdentity),
    Disposed(NoteIdentity),
}

/// Result of a key-down. Everything but `Started` is a silent drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDown {
    Started,
    /// Key repeat while held
    AlreadySounding,
    PolyphonyExhausted,
}

/// Polyphony settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSettings {
    /// Maximum simultaneous voices
    pub budget: usize,
    /// Gain shared between simultaneous voices
    pub max_volume: f64,
    pub envelope: Envelope,
    /// Wait after the release ends before teardown
    pub teardown_margin: f64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            budget: 8,
            max_volume: 0.8,
            envelope: Envelope::new(),
            teardown_margin: 0.05,
        }
    }
}

/// Active voices keyed by note, plus releases waiting for teardown
pub struct VoicePool {
    ctx: AudioContext,
    output: NodeId,
    settings: PoolSettings,
    voices: HashMap<NoteIdentity, Voice>,
    pending: Vec<Disposal>,
    events: broadcast::Sender<VoiceEvent>,
}

impl VoicePool {
    /// Create a pool whose voices feed `output`
    pub fn new(ctx: AudioContext, output: NodeId, settings: PoolSettings) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            ctx,
            output,
            settings,
            voices: HashMap::new(),
            pending: Vec::new(),
            events,
        }
    }

    /// Subscribe to voice start/stop/dispose notifications
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Gain for a voice joining `active` others: `max_volume / min(budget, active + 1)`
    pub fn voice_gain(&self, active: usize) -> f64 {
        self.settings.max_volume / self.settings.budget.min(active + 1).max(1) as f64
    }

    /// Start a voice for `note` with the store's current parameters
    pub fn on_key_down(&mut self, note: NoteIdentity, store: &ParameterStore) -> KeyDown {
        if self.voices.contains_key(&note) {
            return KeyDown::AlreadySounding;
        }
        let pitch = note.pitch();
        if self.voices.len() >= self.settings.budget {
            debug!(%note, budget = self.settings.budget, "polyphony exhausted, note dropped");
            return KeyDown::PolyphonyExhausted;
        }

        // Fixed at creation: existing voices keep the share they started with
        let gain = self.voice_gain(self.voices.len());
        let params = store.snapshot();
        let envelope = self.settings.envelope;
        let output = self.output;

        let voice = self.ctx.with(|graph| {
            let mut voice = Voice::create(graph, note, pitch, params, envelope, gain, output);
            voice.start(graph);
            voice
        });

        debug!(%note, pitch, gain, mode = %voice.params().mode, "voice started");
        self.voices.insert(note, voice);
        self.notify(VoiceEvent::Started(note));
        KeyDown::Started
    }

    /// Release the voice for `note`, if any. Returns whether one was released.
    pub fn on_key_up(&mut self, note: NoteIdentity) -> bool {
        let Some(voice) = self.voices.remove(&note) else {
            return false;
        };

        let margin = self.settings.teardown_margin;
        let disposal = self.ctx.with(|graph| voice.stop(graph, margin));

        debug!(%note, due = disposal.due(), "voice releasing");
        self.pending.push(disposal);
        self.notify(VoiceEvent::Stopped(note));
        true
    }

    /// Release every active voice
    pub fn release_all(&mut self) -> usize {
        let notes: Vec<NoteIdentity> = self.voices.keys().copied().collect();
        notes.into_iter().filter(|note| self.on_key_up(*note)).count()
    }

    /// Run every teardown whose release has finished on the audio clock
    pub fn poll(&mut self) -> usize {
        let now = self.ctx.current_time();
        let (due, waiting): (Vec<Disposal>, Vec<Disposal>) =
            self.pending.drain(..).partition(|disposal| disposal.is_due(now));
        self.pending = waiting;
        self.dispose(due)
    }

    /// Run every pending teardown now
    pub fn flush(&mut self) -> usize {
        let all: Vec<Disposal> = self.pending.drain(..).collect();
        self.dispose(all)
    }

    fn dispose(&mut self, disposals: Vec<Disposal>) -> usize {
        let mut count = 0;
        for mut disposal in disposals {
            if self.ctx.with(|graph| disposal.run(graph)) {
                debug!(note = %disposal.note(), "voice disposed");
                self.notify(VoiceEvent::Disposed(disposal.note()));
                count += 1;
            }
        }
        count
    }

    fn notify(&self, event: VoiceEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_active(&self, note: NoteIdentity) -> bool {
        self.voices.contains_key(&note)
    }

    pub fn voice(&self, note: NoteIdentity) -> Option<&Voice> {
        self.voices.get(&note)
    }

    /// Notes currently held, lowest pitch first
    pub fn active_notes(&self) -> Vec<NoteIdentity> {
        let mut notes: Vec<NoteIdentity> = self.voices.keys().copied().collect();
        notes.sort();
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap;
    use crate::synth::{SynthesisMode, VoicePhase};

    fn note(c: char) -> NoteIdentity {
        NoteIdentity::from_char(c).unwrap()
    }

    fn pool() -> (AudioContext, VoicePool) {
        let ctx = AudioContext::new(44100.0);
        let output = ctx.with(|graph| {
            let output = graph.create_gain(0.3);
            graph.connect(output, graph.destination());
            output
        });
        let pool = VoicePool::new(ctx.clone(), output, PoolSettings::default());
        (ctx, pool)
    }

    #[test]
    fn test_key_repeat_is_ignored() {
        let (_ctx, mut pool) = pool();
        let mut store = ParameterStore::default();

        assert_eq!(pool.on_key_down(note('S'), &store), KeyDown::Started);
        let gain = pool.voice(note('S')).map(|v| v.gain());

        store.set_mode(SynthesisMode::Fm);
        assert_eq!(pool.on_key_down(note('S'), &store), KeyDown::AlreadySounding);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.voice(note('S')).map(|v| v.gain()), gain);
        assert_eq!(
            pool.voice(note('S')).map(|v| v.params().mode),
            Some(SynthesisMode::Simple)
        );
    }

    #[test]
    fn test_budget_admission() {
        let (_ctx, mut pool) = pool();
        let store = ParameterStore::default();
        let notes: Vec<NoteIdentity> = keymap::identities().collect();

        for n in &notes[..8] {
            assert_eq!(pool.on_key_down(*n, &store), KeyDown::Started);
        }
        assert_eq!(pool.on_key_down(notes[8], &store), KeyDown::PolyphonyExhausted);
        assert_eq!(pool.active_count(), 8);

        assert!(pool.on_key_up(notes[0]));
        assert_eq!(pool.on_key_down(notes[8], &store), KeyDown::Started);
        assert_eq!(pool.active_count(), 8);
    }

    #[test]
    fn test_gain_is_fixed_at_creation() {
        let (_ctx, mut pool) = pool();
        let store = ParameterStore::default();

        pool.on_key_down(note('S'), &store);
        pool.on_key_down(note('D'), &store);
        pool.on_key_down(note('F'), &store);

        assert_eq!(pool.voice(note('S')).map(|v| v.gain()), Some(0.8));
        assert_eq!(pool.voice(note('D')).map(|v| v.gain()), Some(0.4));
        assert!((pool.voice(note('F')).map(|v| v.gain()).unwrap() - 0.8 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_key_up_without_voice() {
        let (_ctx, mut pool) = pool();
        assert!(!pool.on_key_up(note('S')));
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn test_teardown_waits_for_release() {
        let (ctx, mut pool) = pool();
        let store = ParameterStore::default();

        pool.on_key_down(note('J'), &store);
        pool.on_key_up(note('J'));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.pending_count(), 1);

        ctx.render_seconds(0.2);
        assert_eq!(pool.poll(), 0);

        ctx.render_seconds(0.2);
        assert_eq!(pool.poll(), 1);
        assert_eq!(pool.pending_count(), 0);
        assert_eq!(ctx.node_count(), 1);
    }

    #[test]
    fn test_events_are_broadcast() {
        let (ctx, mut pool) = pool();
        let mut rx = pool.subscribe();
        let store = ParameterStore::default();

        pool.on_key_down(note('E'), &store);
        pool.on_key_up(note('E'));
        ctx.render_seconds(0.5);
        pool.poll();

        assert_eq!(rx.try_recv().unwrap(), VoiceEvent::Started(note('E')));
        assert_eq!(rx.try_recv().unwrap(), VoiceEvent::Stopped(note('E')));
        assert_eq!(rx.try_recv().unwrap(), VoiceEvent::Disposed(note('E')));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_retrigger_during_release_is_independent() {
        let (ctx, mut pool) = pool();
        let store = ParameterStore::default();

        pool.on_key_down(note('K'), &store);
        pool.on_key_up(note('K'));
        ctx.render_seconds(0.1);

        assert_eq!(pool.on_key_down(note('K'), &store), KeyDown::Started);
        let amp = pool.voice(note('K')).map(|v| v.amp()).unwrap();

        ctx.render_seconds(0.3);
        assert_eq!(pool.poll(), 1);

        // The stale teardown left the new voice alone
        assert!(ctx.with(|graph| graph.is_live(amp)));
        assert_eq!(pool.voice(note('K')).map(|v| v.phase()), Some(VoicePhase::Sounding));
    }

    #[test]
    fn test_release_all_and_flush() {
        let (ctx, mut pool) = pool();
        let store = ParameterStore::default();
        pool.on_key_down(note('S'), &store);
        pool.on_key_down(note('H'), &store);

        assert_eq!(pool.release_all(), 2);
        assert_eq!(pool.flush(), 2);
        assert_eq!(ctx.node_count(), 1);
    }

    #[test]
    fn test_active_notes_sorted_by_pitch() {
        let (_ctx, mut pool) = pool();
        let store = ParameterStore::default();
        pool.on_key_down(note('L'), &store);
        pool.on_key_down(note('S'), &store);
        pool.on_key_down(note('E'), &store);

        assert_eq!(pool.active_notes(), vec![note('S'), note('E'), note('L')]);
    }
}
