//! A single sounding note
//!
//! A voice owns its slice of the audio graph from creation until the
//! disposal returned by [`Voice::stop`] has run.

use super::strategy::{Strategy, VoiceNode};
use super::{Envelope, LfoTarget, SynthesisParameters, Waveform};
use crate::audio::{AudioGraph, NodeId, ParamKind};
use crate::keymap::NoteIdentity;

/// Vibrato swing as a fraction of the voice pitch at full LFO depth
pub const VIBRATO_RANGE: f64 = 0.02;

/// Lifecycle of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Created,
    Sounding,
    Releasing,
    Disposed,
}

pub struct Voice {
    note: NoteIdentity,
    pitch: f64,
    params: SynthesisParameters,
    envelope: Envelope,
    /// Attack peak for this voice, fixed at creation
    gain: f64,
    amp: NodeId,
    pitched: Vec<NodeId>,
    nodes: Vec<VoiceNode>,
    tremolo: Option<NodeId>,
    phase: VoicePhase,
}

impl Voice {
    /// Build the voice's sub-graph and wire it into `output`. Silent until started.
    pub fn create(
        graph: &mut AudioGraph,
        note: NoteIdentity,
        pitch: f64,
        params: SynthesisParameters,
        envelope: Envelope,
        gain: f64,
        output: NodeId,
    ) -> Self {
        let amp = graph.create_gain(0.0);
        graph.connect(amp, output);

        let sub = Strategy::from_params(&params).build(graph, pitch, amp);
        let mut nodes = sub.nodes;
        nodes.push(VoiceNode::Processor(amp));

        Self {
            note,
            pitch,
            params,
            envelope,
            gain,
            amp,
            pitched: sub.pitched,
            nodes,
            tremolo: None,
            phase: VoicePhase::Created,
        }
    }

    /// Apply the attack/decay envelope, attach the LFO and start every source
    pub fn start(&mut self, graph: &mut AudioGraph) {
        if self.phase != VoicePhase::Created {
            return;
        }
        let now = graph.current_time();

        if let Some(param) = graph.param_mut(self.amp, ParamKind::Gain) {
            self.envelope.schedule_start(param, self.gain, now);
        }
        if self.params.lfo.is_enabled() {
            self.apply_lfo(graph);
        }
        for node in self.nodes.iter().filter(|node| node.is_source()) {
            graph.start(node.id(), now);
        }

        self.phase = VoicePhase::Sounding;
    }

    /// Vibrato into every pitched oscillator, or tremolo into the amplitude node
    fn apply_lfo(&mut self, graph: &mut AudioGraph) {
        let lfo = self.params.lfo;
        let osc = graph.create_oscillator(Waveform::Sine, lfo.rate);

        let depth = match lfo.target {
            LfoTarget::Pitch => {
                let depth = graph.create_gain(self.pitch * VIBRATO_RANGE * lfo.depth);
                for &id in &self.pitched {
                    graph.connect_param(depth, id, ParamKind::Frequency);
                }
                depth
            }
            LfoTarget::Volume => {
                let sustain = self.envelope.sustain_level(self.gain);
                let depth = graph.create_gain(sustain * lfo.depth);
                graph.connect_param(depth, self.amp, ParamKind::Gain);
                self.tremolo = Some(depth);
                depth
            }
        };
        graph.connect(osc, depth);

        // Tear down ahead of the amplitude node
        let amp = self.nodes.pop();
        self.nodes.push(VoiceNode::Source(osc));
        self.nodes.push(VoiceNode::Processor(depth));
        self.nodes.extend(amp);
    }

    /// Begin the release and hand back the deferred teardown.
    ///
    /// Consumes the voice: nothing may touch it across the release boundary.
    pub fn stop(mut self, graph: &mut AudioGraph, margin: f64) -> Disposal {
        let now = graph.current_time();
        let mut release_end = now + self.envelope.release();
        let mut level = 0.0;

        if let Some(param) = graph.param_mut(self.amp, ParamKind::Gain) {
            level = param.value_at(now);
            release_end = self.envelope.schedule_release_from(param, level, now);
        }
        // Tremolo swing may not exceed the envelope, or the gain would go negative
        if let Some(tremolo) = self.tremolo {
            if let Some(param) = graph.param_mut(tremolo, ParamKind::Gain) {
                let depth = param.value_at(now).min(level);
                self.envelope.schedule_release_from(param, depth, now);
            }
        }
        for node in self.nodes.iter().filter(|node| node.is_source()) {
            graph.stop(node.id(), release_end);
        }

        self.phase = VoicePhase::Releasing;
        Disposal {
            note: self.note,
            nodes: self.nodes,
            due: release_end + margin,
            phase: self.phase,
        }
    }

    pub fn note(&self) -> NoteIdentity {
        self.note
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn params(&self) -> &SynthesisParameters {
        &self.params
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    /// The voice's amplitude node
    pub fn amp(&self) -> NodeId {
        self.amp
    }

    /// Oscillators tracking the note pitch
    pub fn pitched(&self) -> &[NodeId] {
        &self.pitched
    }

    /// Gain node scaling the tremolo LFO, if any
    pub fn tremolo(&self) -> Option<NodeId> {
        self.tremolo
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Deferred teardown of a released voice.
///
/// Holds only the node handles it was given, so running it late, or twice,
/// cannot affect a newer voice for the same key.
#[derive(Debug)]
pub struct Disposal {
    note: NoteIdentity,
    nodes: Vec<VoiceNode>,
    due: f64,
    phase: VoicePhase,
}

impl Disposal {
    pub fn note(&self) -> NoteIdentity {
        self.note
    }

    /// Audio-clock time after which the release is inaudible
    pub fn due(&self) -> f64 {
        self.due
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    pub fn is_due(&self, now: f64) -> bool {
        now >= self.due
    }

    /// Stop and free every node. Returns false if already disposed.
    pub fn run(&mut self, graph: &mut AudioGraph) -> bool {
        if self.phase == VoicePhase::Disposed {
            return false;
        }
        let now = graph.current_time();
        for node in &self.nodes {
            node.dispose(graph, now);
        }
        self.phase = VoicePhase::Disposed;
        true
    }
}
