//! Audio graph: node arena, connections and per-sample rendering

use super::param::{AudioParam, ParamKind};
use crate::synth::{Oscillator, Waveform};

/// Handle to a node in the graph.
///
/// Ids carry a generation so that a handle to a removed node never aliases
/// a node created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

enum NodeKind {
    Oscillator {
        osc: Oscillator,
        frequency: AudioParam,
        last_frequency: f64,
    },
    Gain {
        gain: AudioParam,
    },
    Constant {
        offset: AudioParam,
    },
    Destination,
}

struct Node {
    kind: NodeKind,
    /// Audio inputs, summed
    inputs: Vec<NodeId>,
    /// Inputs added onto a parameter's automated value
    param_inputs: Vec<(ParamKind, NodeId)>,
    start: Option<f64>,
    stop: Option<f64>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            param_inputs: Vec::new(),
            start: None,
            stop: None,
        }
    }

    fn is_source(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Oscillator { .. } | NodeKind::Constant { .. }
        )
    }

    fn is_playing(&self, time: f64) -> bool {
        self.start.is_some_and(|start| time >= start) && self.stop.map_or(true, |stop| time < stop)
    }

    fn param(&self, kind: ParamKind) -> Option<&AudioParam> {
        match (&self.kind, kind) {
            (NodeKind::Oscillator { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(gain),
            (NodeKind::Constant { offset }, ParamKind::Offset) => Some(offset),
            _ => None,
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match (&mut self.kind, kind) {
            (NodeKind::Oscillator { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(gain),
            (NodeKind::Constant { offset }, ParamKind::Offset) => Some(offset),
            _ => None,
        }
    }

    fn modulation(&self, kind: ParamKind, outputs: &[f64]) -> f64 {
        self.param_inputs
            .iter()
            .filter(|(target, _)| *target == kind)
            .map(|(_, id)| outputs[id.index])
            .sum()
    }

    fn process(&mut self, time: f64, outputs: &[f64]) -> f64 {
        let input: f64 = self.inputs.iter().map(|id| outputs[id.index]).sum();
        let playing = self.is_playing(time);
        let frequency_mod = self.modulation(ParamKind::Frequency, outputs);
        let gain_mod = self.modulation(ParamKind::Gain, outputs);
        let offset_mod = self.modulation(ParamKind::Offset, outputs);

        match &mut self.kind {
            NodeKind::Oscillator {
                osc,
                frequency,
                last_frequency,
            } => {
                let hz = frequency.value_at(time) + frequency_mod;
                *last_frequency = hz;
                if playing {
                    osc.generate(hz)
                } else {
                    0.0
                }
            }
            NodeKind::Gain { gain } => input * (gain.value_at(time) + gain_mod),
            NodeKind::Constant { offset } => {
                if playing {
                    offset.value_at(time) + offset_mod
                } else {
                    0.0
                }
            }
            NodeKind::Destination => input,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The rendering graph shared between the control thread and the audio callback
pub struct AudioGraph {
    sample_rate: f64,
    frame: u64,
    slots: Vec<Slot>,
    free: Vec<usize>,
    destination: NodeId,
    order: Vec<usize>,
    order_dirty: bool,
    outputs: Vec<f64>,
}

impl AudioGraph {
    /// Create an empty graph containing only the destination node
    pub fn new(sample_rate: f64) -> Self {
        let mut graph = Self {
            sample_rate,
            frame: 0,
            slots: Vec::new(),
            free: Vec::new(),
            destination: NodeId {
                index: 0,
                generation: 0,
            },
            order: Vec::new(),
            order_dirty: true,
            outputs: Vec::new(),
        };
        graph.destination = graph.insert(Node::new(NodeKind::Destination));
        graph
    }

    /// The summing output of the graph
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Change the sample rate, e.g. to match the output device
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for slot in &mut self.slots {
            if let Some(Node {
                kind: NodeKind::Oscillator { osc, .. },
                ..
            }) = &mut slot.node
            {
                osc.set_sample_rate(sample_rate);
            }
        }
    }

    /// Time in seconds of the next sample to be rendered
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    /// Number of frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Number of live nodes, not counting the destination
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count() - 1
    }

    /// Whether the id still refers to a node in the graph
    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn create_oscillator(&mut self, waveform: Waveform, frequency: f64) -> NodeId {
        self.insert(Node::new(NodeKind::Oscillator {
            osc: Oscillator::new(waveform, self.sample_rate),
            frequency: AudioParam::new(frequency),
            last_frequency: frequency,
        }))
    }

    pub fn create_gain(&mut self, gain: f64) -> NodeId {
        self.insert(Node::new(NodeKind::Gain {
            gain: AudioParam::new(gain),
        }))
    }

    pub fn create_constant(&mut self, offset: f64) -> NodeId {
        self.insert(Node::new(NodeKind::Constant {
            offset: AudioParam::new(offset),
        }))
    }

    /// Route `from`'s output into `to`'s audio input
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
        if !self.is_live(from) || from == to {
            return false;
        }
        match self.node_mut(to) {
            Some(node) => {
                node.inputs.push(from);
                self.order_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Add `from`'s output onto a parameter of `to`
    pub fn connect_param(&mut self, from: NodeId, to: NodeId, kind: ParamKind) -> bool {
        if !self.is_live(from) || from == to {
            return false;
        }
        match self.node_mut(to) {
            Some(node) if node.param(kind).is_some() => {
                node.param_inputs.push((kind, from));
                self.order_dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Remove every outgoing connection of `id`
    pub fn disconnect(&mut self, id: NodeId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        for slot in &mut self.slots {
            if let Some(node) = &mut slot.node {
                node.inputs.retain(|input| *input != id);
                node.param_inputs.retain(|(_, input)| *input != id);
            }
        }
        self.order_dirty = true;
        true
    }

    /// Schedule a source node to start producing output
    pub fn start(&mut self, id: NodeId, at: f64) -> bool {
        match self.node_mut(id) {
            Some(node) if node.is_source() && node.start.is_none() => {
                node.start = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Schedule a source node to fall silent. An earlier stop time wins.
    pub fn stop(&mut self, id: NodeId, at: f64) -> bool {
        match self.node_mut(id) {
            Some(node) if node.is_source() => {
                node.stop = Some(node.stop.map_or(at, |stop| stop.min(at)));
                true
            }
            _ => false,
        }
    }

    /// Disconnect and free a node. Stale ids are ignored.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.destination || !self.disconnect(id) {
            return false;
        }
        let slot = &mut self.slots[id.index];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.outputs[id.index] = 0.0;
        self.free.push(id.index);
        true
    }

    pub fn param_mut(&mut self, id: NodeId, kind: ParamKind) -> Option<&mut AudioParam> {
        self.node_mut(id).and_then(|node| node.param_mut(kind))
    }

    /// Automated value of a parameter at the current time, excluding inputs
    pub fn param_value(&self, id: NodeId, kind: ParamKind) -> Option<f64> {
        let time = self.current_time();
        self.node(id)
            .and_then(|node| node.param(kind))
            .map(|param| param.value_at(time))
    }

    /// Instantaneous frequency of an oscillator at the last rendered sample
    pub fn oscillator_frequency(&self, id: NodeId) -> Option<f64> {
        match self.node(id) {
            Some(Node {
                kind: NodeKind::Oscillator { last_frequency, .. },
                ..
            }) => Some(*last_frequency),
            _ => None,
        }
    }

    /// Render one sample of the destination
    pub fn next_sample(&mut self) -> f64 {
        if self.order_dirty {
            self.rebuild_order();
        }

        let time = self.current_time();
        for position in 0..self.order.len() {
            let index = self.order[position];
            if let Some(node) = &mut self.slots[index].node {
                let value = node.process(time, &self.outputs);
                self.outputs[index] = value;
            }
        }

        self.frame += 1;
        self.outputs[self.destination.index]
    }

    /// Fill a mono buffer
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample() as f32;
        }
    }

    fn insert(&mut self, node: Node) -> NodeId {
        self.order_dirty = true;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.outputs.push(0.0);
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Depth-first post-order so every node runs after its inputs.
    /// Cycles are broken by reading the previous sample's output.
    fn rebuild_order(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Visiting,
            Done,
        }

        let mut marks = vec![Mark::New; self.slots.len()];
        let mut order = Vec::with_capacity(self.slots.len());

        for root in 0..self.slots.len() {
            if marks[root] != Mark::New || self.slots[root].node.is_none() {
                continue;
            }
            let mut stack = vec![(root, false)];
            while let Some((index, expanded)) = stack.pop() {
                if expanded {
                    marks[index] = Mark::Done;
                    order.push(index);
                    continue;
                }
                if marks[index] != Mark::New {
                    continue;
                }
                marks[index] = Mark::Visiting;
                stack.push((index, true));
                if let Some(node) = &self.slots[index].node {
                    let upstream = node
                        .inputs
                        .iter()
                        .chain(node.param_inputs.iter().map(|(_, id)| id));
                    for input in upstream {
                        if marks[input.index] == Mark::New {
                            stack.push((input.index, false));
                        }
                    }
                }
            }
        }

        self.order = order;
        self.order_dirty = false;
    }
}
