//! Synthesis strategies
//!
//! Each strategy builds the oscillator sub-graph of one voice and feeds it
//! into the voice's amplitude node. Nothing is started here; the voice
//! starts its sources together with its envelope.

use super::params::{AmParams, FmParams, Partial, SynthesisMode, SynthesisParameters};
use super::Waveform;
use crate::audio::{AudioGraph, NodeId, ParamKind};

/// A node owned by a voice, tagged by what teardown has to do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceNode {
    /// Generates signal: must be started, stopped and disconnected
    Source(NodeId),
    /// Processes signal: only disconnected
    Processor(NodeId),
}

impl VoiceNode {
    pub fn id(&self) -> NodeId {
        match *self {
            VoiceNode::Source(id) | VoiceNode::Processor(id) => id,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, VoiceNode::Source(_))
    }

    /// Stop (if a source) and free the node. Safe to call twice.
    pub fn dispose(&self, graph: &mut AudioGraph, now: f64) -> bool {
        if let VoiceNode::Source(id) = *self {
            graph.stop(id, now);
        }
        graph.remove(self.id())
    }
}

/// The nodes a strategy built
#[derive(Debug, Default)]
pub struct SubGraph {
    /// Oscillators whose frequency follows the note pitch
    pub pitched: Vec<NodeId>,
    /// Every node, for start and teardown
    pub nodes: Vec<VoiceNode>,
}

impl SubGraph {
    fn source(&mut self, id: NodeId) -> NodeId {
        self.nodes.push(VoiceNode::Source(id));
        id
    }

    fn processor(&mut self, id: NodeId) -> NodeId {
        self.nodes.push(VoiceNode::Processor(id));
        id
    }
}

/// Sub-graph builder, resolved once from the mode when a voice is created
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Simple { waveform: Waveform },
    Additive { partials: Vec<Partial> },
    Am(AmParams),
    Fm(FmParams),
}

impl Strategy {
    pub fn from_params(params: &SynthesisParameters) -> Self {
        match params.mode {
            SynthesisMode::Simple => Strategy::Simple {
                waveform: params.waveform,
            },
            SynthesisMode::Additive => Strategy::Additive {
                partials: params.additive.partials.clone(),
            },
            SynthesisMode::Am => Strategy::Am(params.am),
            SynthesisMode::Fm => Strategy::Fm(params.fm),
        }
    }

    pub fn mode(&self) -> SynthesisMode {
        match self {
            Strategy::Simple { .. } => SynthesisMode::Simple,
            Strategy::Additive { .. } => SynthesisMode::Additive,
            Strategy::Am(_) => SynthesisMode::Am,
            Strategy::Fm(_) => SynthesisMode::Fm,
        }
    }

    /// Build the sub-graph at `pitch` feeding `target`
    pub fn build(&self, graph: &mut AudioGraph, pitch: f64, target: NodeId) -> SubGraph {
        match self {
            Strategy::Simple { waveform } => build_simple(graph, *waveform, pitch, target),
            Strategy::Additive { partials } => build_additive(graph, partials, pitch, target),
            Strategy::Am(am) => build_am(graph, am, pitch, target),
            Strategy::Fm(fm) => build_fm(graph, fm, pitch, target),
        }
    }
}

fn build_simple(graph: &mut AudioGraph, waveform: Waveform, pitch: f64, target: NodeId) -> SubGraph {
    let mut sub = SubGraph::default();
    let osc = sub.source(graph.create_oscillator(waveform, pitch));
    graph.connect(osc, target);
    sub.pitched.push(osc);
    sub
}

/// One sine per partial, each through its own attenuator
fn build_additive(graph: &mut AudioGraph, partials: &[Partial], pitch: f64, target: NodeId) -> SubGraph {
    let mut sub = SubGraph::default();
    for partial in partials {
        let osc = sub.source(graph.create_oscillator(Waveform::Sine, pitch * partial.harmonic as f64));
        let level = sub.processor(graph.create_gain(partial.amplitude));
        graph.connect(osc, level);
        graph.connect(level, target);
        sub.pitched.push(osc);
    }
    sub
}

/// Carrier gain = (1 - depth) + depth * (m + 1) / 2, so the output swings
/// between (1 - depth) and 1 of the carrier at the modulator rate.
fn build_am(graph: &mut AudioGraph, am: &AmParams, pitch: f64, target: NodeId) -> SubGraph {
    let mut sub = SubGraph::default();
    let carrier = sub.source(graph.create_oscillator(am.carrier, pitch));
    let modulator = sub.source(graph.create_oscillator(am.modulator, am.modulator_frequency));
    let depth = sub.processor(graph.create_gain(am.depth / 2.0));
    let shaper = sub.processor(graph.create_gain(1.0 - am.depth / 2.0));

    graph.connect(modulator, depth);
    graph.connect_param(depth, shaper, ParamKind::Gain);
    graph.connect(carrier, shaper);
    graph.connect(shaper, target);

    sub.pitched.push(carrier);
    sub
}

/// Modulator scaled to a peak deviation of index * modulator frequency,
/// added onto the carrier frequency.
fn build_fm(graph: &mut AudioGraph, fm: &FmParams, pitch: f64, target: NodeId) -> SubGraph {
    let mut sub = SubGraph::default();
    let carrier = sub.source(graph.create_oscillator(fm.carrier, pitch));
    let modulator = sub.source(graph.create_oscillator(fm.modulator, fm.modulator_frequency));
    let deviation = sub.processor(graph.create_gain(fm.index * fm.modulator_frequency));

    graph.connect(modulator, deviation);
    graph.connect_param(deviation, carrier, ParamKind::Frequency);
    graph.connect(carrier, target);

    sub.pitched.push(carrier);
    sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::generate_partials;

    const SAMPLE_RATE: f64 = 44100.0;

    /// Build a strategy into a unity-gain target and start every source
    fn build_running(strategy: &Strategy, pitch: f64) -> (AudioGraph, SubGraph) {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let target = graph.create_gain(1.0);
        graph.connect(target, graph.destination());
        let sub = strategy.build(&mut graph, pitch, target);
        for node in sub.nodes.iter().filter(|node| node.is_source()) {
            graph.start(node.id(), 0.0);
        }
        (graph, sub)
    }

    /// Peak level of each consecutive window
    fn window_peaks(graph: &mut AudioGraph, windows: usize, width: usize) -> Vec<f64> {
        (0..windows)
            .map(|_| {
                (0..width)
                    .map(|_| graph.next_sample().abs())
                    .fold(0.0, f64::max)
            })
            .collect()
    }

    #[test]
    fn test_simple_builds_one_generator() {
        let strategy = Strategy::Simple {
            waveform: Waveform::Square,
        };
        let (mut graph, sub) = build_running(&strategy, 261.63);

        assert_eq!(sub.nodes.len(), 1);
        assert_eq!(sub.pitched.len(), 1);
        graph.next_sample();
        assert_eq!(graph.oscillator_frequency(sub.pitched[0]), Some(261.63));
    }

    #[test]
    fn test_strategy_does_not_start_nodes() {
        let strategy = Strategy::Simple {
            waveform: Waveform::Square,
        };
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let target = graph.create_gain(1.0);
        graph.connect(target, graph.destination());
        strategy.build(&mut graph, 440.0, target);

        assert!((0..100).all(|_| graph.next_sample() == 0.0));
    }

    #[test]
    fn test_additive_harmonics() {
        let strategy = Strategy::Additive {
            partials: generate_partials(4, 0.0),
        };
        let (mut graph, sub) = build_running(&strategy, 200.0);

        assert_eq!(sub.nodes.len(), 8);
        graph.next_sample();
        let frequencies: Vec<f64> = sub
            .pitched
            .iter()
            .filter_map(|id| graph.oscillator_frequency(*id))
            .collect();
        assert_eq!(frequencies, vec![200.0, 400.0, 600.0, 800.0]);
    }

    #[test]
    fn test_am_without_depth_is_unmodulated() {
        let strategy = Strategy::Am(AmParams {
            modulator_frequency: 5.0,
            depth: 0.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
        });
        // 441 Hz at 44.1 kHz: exactly 100 samples per period
        let (mut graph, _) = build_running(&strategy, 441.0);

        let peaks = window_peaks(&mut graph, 400, 100);
        for peak in peaks {
            assert!((peak - 1.0).abs() < 1e-3, "peak {}", peak);
        }
    }

    #[test]
    fn test_am_full_depth_reaches_silence() {
        let strategy = Strategy::Am(AmParams {
            modulator_frequency: 5.0,
            depth: 1.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
        });
        let (mut graph, _) = build_running(&strategy, 441.0);

        let peaks = window_peaks(&mut graph, 441, 100);
        let min = peaks.iter().cloned().fold(f64::MAX, f64::min);
        let max = peaks.iter().cloned().fold(0.0, f64::max);
        assert!(min < 0.01, "trough {}", min);
        assert!(max > 0.99, "crest {}", max);
    }

    #[test]
    fn test_am_partial_depth_floor() {
        let strategy = Strategy::Am(AmParams {
            modulator_frequency: 5.0,
            depth: 0.4,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
        });
        let (mut graph, _) = build_running(&strategy, 441.0);

        let peaks = window_peaks(&mut graph, 441, 100);
        let min = peaks.iter().cloned().fold(f64::MAX, f64::min);
        assert!((min - 0.6).abs() < 0.01, "trough {}", min);
    }

    #[test]
    fn test_fm_without_index_is_pure_carrier() {
        let strategy = Strategy::Fm(FmParams {
            modulator_frequency: 333.0,
            index: 0.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
        });
        let (mut graph, sub) = build_running(&strategy, 440.0);

        for _ in 0..2000 {
            graph.next_sample();
            assert_eq!(graph.oscillator_frequency(sub.pitched[0]), Some(440.0));
        }
    }

    #[test]
    fn test_fm_deviation_scales_with_index() {
        let strategy = Strategy::Fm(FmParams {
            modulator_frequency: 100.0,
            index: 2.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
        });
        let (mut graph, sub) = build_running(&strategy, 440.0);

        let mut deviation: f64 = 0.0;
        for _ in 0..1000 {
            graph.next_sample();
            if let Some(hz) = graph.oscillator_frequency(sub.pitched[0]) {
                deviation = deviation.max((hz - 440.0).abs());
            }
        }
        assert!(deviation > 190.0 && deviation <= 200.0 + 1e-9, "deviation {}", deviation);
    }

    #[test]
    fn test_strategy_follows_mode() {
        let mut params = SynthesisParameters::default();
        params.mode = SynthesisMode::Additive;
        assert_eq!(Strategy::from_params(&params).mode(), SynthesisMode::Additive);

        params.mode = SynthesisMode::Fm;
        assert_eq!(Strategy::from_params(&params), Strategy::Fm(params.fm));
    }

    #[test]
    fn test_dispose_twice() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let node = VoiceNode::Source(graph.create_oscillator(Waveform::Sine, 440.0));

        assert!(node.dispose(&mut graph, 0.0));
        assert!(!node.dispose(&mut graph, 0.0));
    }
}
