use std::time::Duration;

use shared::domain::CamVector;
use tokio::time::Instant;

use crate::error::TrackerError;

pub const RECORDING_DELAY: Duration = Duration::from_secs(10);
pub const RECORDING_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
enum RecorderState {
    #[default]
    Idle,
    Arming {
        capture_at: Instant,
    },
    Capturing {
        until: Instant,
        buffer: Vec<CamVector>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecorderStep {
    Started,
    Finished(Vec<CamVector>),
}

/// Captures the broadcast camera vectors of one bounded window.
#[derive(Debug, Default)]
pub struct TestRecorder {
    state: RecorderState,
}

impl TestRecorder {
    pub fn is_pending(&self) -> bool {
        !matches!(self.state, RecorderState::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, RecorderState::Capturing { .. })
    }

    pub fn request(&mut self, now: Instant) -> Result<(), TrackerError> {
        if self.is_pending() {
            return Err(TrackerError::RecordingInProgress);
        }
        self.state = RecorderState::Arming {
            capture_at: now + RECORDING_DELAY,
        };
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            RecorderState::Idle => None,
            RecorderState::Arming { capture_at } => Some(*capture_at),
            RecorderState::Capturing { until, .. } => Some(*until),
        }
    }

    pub fn advance(&mut self, now: Instant) -> Option<RecorderStep> {
        self.fire(now, true)
    }

    /// Like [`TestRecorder::advance`], but a window closing exactly at `now`
    /// stays open for an input stamped at that instant.
    pub fn advance_before_input(&mut self, now: Instant) -> Option<RecorderStep> {
        self.fire(now, false)
    }

    fn fire(&mut self, now: Instant, close_at_now: bool) -> Option<RecorderStep> {
        let deadline = self.next_deadline()?;
        let due = match self.state {
            RecorderState::Capturing { .. } if !close_at_now => now > deadline,
            _ => now >= deadline,
        };
        if !due {
            return None;
        }
        match std::mem::take(&mut self.state) {
            RecorderState::Arming { capture_at } => {
                self.state = RecorderState::Capturing {
                    until: capture_at + RECORDING_WINDOW,
                    buffer: Vec::new(),
                };
                Some(RecorderStep::Started)
            }
            RecorderState::Capturing { buffer, .. } => Some(RecorderStep::Finished(buffer)),
            RecorderState::Idle => None,
        }
    }

    pub fn observe(&mut self, vector: CamVector) {
        if let RecorderState::Capturing { buffer, .. } = &mut self.state {
            buffer.push(vector);
        }
    }

    /// Discards an open capture window. Arming is left alone.
    pub fn cancel(&mut self) -> bool {
        if !self.is_capturing() {
            return false;
        }
        self.state = RecorderState::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arms_then_captures_then_finishes_in_order() {
        let t0 = Instant::now();
        let mut recorder = TestRecorder::default();
        recorder.request(t0).expect("request");

        recorder.observe(CamVector::new(9.0, 9.0, 9.0));
        assert_eq!(recorder.advance(t0 + Duration::from_secs(9)), None);
        assert_eq!(
            recorder.advance(t0 + RECORDING_DELAY),
            Some(RecorderStep::Started)
        );
        assert!(recorder.is_capturing());

        recorder.observe(CamVector::new(1.0, 0.0, 0.0));
        recorder.observe(CamVector::new(2.0, 0.0, 0.0));
        assert_eq!(
            recorder.next_deadline(),
            Some(t0 + Duration::from_secs(20))
        );

        let step = recorder.advance(t0 + Duration::from_secs(20));
        assert_eq!(
            step,
            Some(RecorderStep::Finished(vec![
                CamVector::new(1.0, 0.0, 0.0),
                CamVector::new(2.0, 0.0, 0.0),
            ]))
        );
        assert!(!recorder.is_pending());
        assert_eq!(recorder.next_deadline(), None);
    }

    #[test]
    fn window_edges_are_inclusive_for_inputs() {
        let t0 = Instant::now();
        let mut recorder = TestRecorder::default();
        recorder.request(t0).expect("request");

        let start = t0 + RECORDING_DELAY;
        assert_eq!(
            recorder.advance_before_input(start),
            Some(RecorderStep::Started)
        );
        recorder.observe(CamVector::new(1.0, 0.0, 0.0));

        let end = start + RECORDING_WINDOW;
        assert_eq!(recorder.advance_before_input(end), None);
        recorder.observe(CamVector::new(2.0, 0.0, 0.0));
        assert_eq!(
            recorder.advance(end),
            Some(RecorderStep::Finished(vec![
                CamVector::new(1.0, 0.0, 0.0),
                CamVector::new(2.0, 0.0, 0.0),
            ]))
        );
    }

    #[test]
    fn cancel_only_discards_an_open_window() {
        let t0 = Instant::now();
        let mut recorder = TestRecorder::default();
        recorder.request(t0).expect("request");
        assert!(!recorder.cancel(), "arming survives");

        recorder.advance(t0 + RECORDING_DELAY);
        recorder.observe(CamVector::ZERO);
        assert!(recorder.cancel());
        assert!(!recorder.is_pending());
        assert_eq!(recorder.advance(t0 + Duration::from_secs(20)), None);
    }

    #[test]
    fn second_request_is_rejected_while_pending() {
        let t0 = Instant::now();
        let mut recorder = TestRecorder::default();
        recorder.request(t0).expect("request");
        assert_eq!(
            recorder.request(t0),
            Err(TrackerError::RecordingInProgress)
        );
    }
}
