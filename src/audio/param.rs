//! Automatable node parameters
//!
//! An `AudioParam` holds a timeline of scheduled value changes. The value at
//! any time is computed from the timeline; node inputs connected to the
//! parameter are summed on top by the graph.

/// Which parameter of a node a connection or automation call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Oscillator frequency in Hz
    Frequency,
    /// Gain node multiplier
    Gain,
    /// Constant source output
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    SetValue { time: f64, value: f64 },
    LinearRamp { time: f64, value: f64 },
    ExponentialRamp { time: f64, value: f64 },
}

impl Automation {
    fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. }
            | Automation::LinearRamp { time, .. }
            | Automation::ExponentialRamp { time, .. } => time,
        }
    }
}

/// A parameter with sample-accurate scheduled automation
#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f64,
    events: Vec<Automation>,
}

impl AudioParam {
    pub fn new(default_value: f64) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(Automation::SetValue { time, value });
    }

    /// Ramp linearly from the previous event to `value`, arriving at `time`
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(Automation::LinearRamp { time, value });
    }

    /// Ramp exponentially from the previous event to `value`, arriving at `time`
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(Automation::ExponentialRamp { time, value });
    }

    /// Remove every event scheduled at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
    }

    /// Number of scheduled events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Compute the automated value at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.default_value;

        for event in &self.events {
            match *event {
                Automation::SetValue { time: at, value } => {
                    if at > time {
                        break;
                    }
                    prev_time = at;
                    prev_value = value;
                }
                Automation::LinearRamp { time: end, value } => {
                    if end <= time {
                        prev_time = end;
                        prev_value = value;
                        continue;
                    }
                    if time < prev_time || end <= prev_time {
                        return prev_value;
                    }
                    let progress = (time - prev_time) / (end - prev_time);
                    return prev_value + (value - prev_value) * progress;
                }
                Automation::ExponentialRamp { time: end, value } => {
                    if end <= time {
                        prev_time = end;
                        prev_value = value;
                        continue;
                    }
                    // Undefined across zero or a sign change: hold until the end
                    if time < prev_time || end <= prev_time || prev_value * value <= 0.0 {
                        return prev_value;
                    }
                    let progress = (time - prev_time) / (end - prev_time);
                    return prev_value * (value / prev_value).powf(progress);
                }
            }
        }

        prev_value
    }

    fn insert(&mut self, event: Automation) {
        // Events at equal times keep insertion order
        let at = self
            .events
            .iter()
            .position(|existing| existing.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value_without_events() {
        let param = AudioParam::new(440.0);
        assert_eq!(param.value_at(0.0), 440.0);
        assert_eq!(param.value_at(10.0), 440.0);
    }

    #[test]
    fn test_set_value_at_time_steps() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(1.0, 0.5);

        assert_eq!(param.value_at(0.49), 0.0);
        assert_eq!(param.value_at(0.5), 1.0);
        assert_eq!(param.value_at(2.0), 1.0);
    }

    #[test]
    fn test_linear_ramp() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.0, 1.0);
        param.linear_ramp_to_value_at_time(1.0, 2.0);

        assert_eq!(param.value_at(1.0), 0.0);
        assert!((param.value_at(1.5) - 0.5).abs() < 1e-12);
        assert_eq!(param.value_at(2.0), 1.0);
        assert_eq!(param.value_at(3.0), 1.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(1.0, 0.0);
        param.exponential_ramp_to_value_at_time(0.25, 1.0);

        // Geometric midpoint
        assert!((param.value_at(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(param.value_at(1.0), 0.25);
    }

    #[test]
    fn test_exponential_ramp_through_zero_holds() {
        let mut param = AudioParam::new(0.0);
        param.exponential_ramp_to_value_at_time(1.0, 1.0);

        assert_eq!(param.value_at(0.5), 0.0);
        assert_eq!(param.value_at(1.0), 1.0);
    }

    #[test]
    fn test_cancel_scheduled_values() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.001, 0.0);
        param.linear_ramp_to_value_at_time(1.0, 0.01);
        param.exponential_ramp_to_value_at_time(0.5, 0.02);

        param.cancel_scheduled_values(0.015);
        assert_eq!(param.event_count(), 2);
        assert_eq!(param.value_at(0.1), 1.0);
    }

    #[test]
    fn test_envelope_shape() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.001, 0.0);
        param.linear_ramp_to_value_at_time(0.8, 0.01);
        param.exponential_ramp_to_value_at_time(0.4, 0.02);

        assert!(param.value_at(0.005) > 0.3 && param.value_at(0.005) < 0.5);
        assert!((param.value_at(0.01) - 0.8).abs() < 1e-12);
        assert!((param.value_at(0.02) - 0.4).abs() < 1e-12);
        assert!((param.value_at(5.0) - 0.4).abs() < 1e-12);
    }
}
