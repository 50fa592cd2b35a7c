use crate::frame::{Frame, Parity};

/// Halves the outgoing update rate by dropping `Skip` frames while enabled.
#[derive(Debug, Default)]
pub struct PowerSaverGate {
    enabled: bool,
}

impl PowerSaverGate {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Loss-of-signal frames always pass so a dead sensor stays visible.
    pub fn admits(&self, frame: &Frame) -> bool {
        match frame {
            Frame::LossOfSignal => true,
            Frame::Sample { parity, .. } => !(self.enabled && *parity == Parity::Skip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameParser;

    #[test]
    fn disabled_gate_admits_everything() {
        let gate = PowerSaverGate::default();
        let mut parser = FrameParser::new();
        assert!((0..4).all(|_| gate.admits(&parser.parse("t 0 0 0"))));
    }

    #[test]
    fn enabled_gate_admits_one_of_two_consecutive_samples() {
        let mut gate = PowerSaverGate::default();
        gate.set_enabled(true);
        let mut parser = FrameParser::new();

        for _ in 0..5 {
            let first = gate.admits(&parser.parse("t 0.1 0.2 0.3"));
            let second = gate.admits(&parser.parse("t 0.1 0.2 0.3"));
            assert!(first ^ second);
        }
    }

    #[test]
    fn loss_of_signal_is_never_dropped() {
        let mut gate = PowerSaverGate::default();
        gate.set_enabled(true);
        let mut parser = FrameParser::new();
        assert!((0..4).all(|_| gate.admits(&parser.parse("t ? ? ?"))));
    }
}
