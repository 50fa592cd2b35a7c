//! Timed yaw-drift measurement.
//!
//! A session walks `Idle → Armed → Measuring → Saving → Idle` on a fixed
//! schedule measured from the moment it was requested. The owner polls
//! [`Calibration::advance`] at [`Calibration::next_deadline`] and reports the
//! latest yaw through [`Calibration::observe`].

use std::{
    f64::consts::{PI, TAU},
    time::Duration,
};

use tokio::time::Instant;

use crate::error::TrackerError;

/// Delay between the request and the start of the measurement.
pub const ARMING_DELAY: Duration = Duration::from_secs(5);
/// Request to save, end to end.
pub const SESSION_LENGTH: Duration = Duration::from_secs(60);
/// `SESSION_LENGTH - ARMING_DELAY`; the divisor for the measured rate.
pub const MEASUREMENT_WINDOW: Duration = Duration::from_secs(55);

const _: () = assert!(
    ARMING_DELAY.as_millis() + MEASUREMENT_WINDOW.as_millis() == SESSION_LENGTH.as_millis()
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Milestone {
    BeginMeasuring,
    Remaining(u64),
    Finish,
}

const SCHEDULE: [(Duration, Milestone); 4] = [
    (ARMING_DELAY, Milestone::BeginMeasuring),
    (Duration::from_secs(30), Milestone::Remaining(30)),
    (Duration::from_secs(45), Milestone::Remaining(15)),
    (SESSION_LENGTH, Milestone::Finish),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Armed,
    Measuring,
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    Measuring,
    Remaining { seconds: u64 },
    /// The session is in `Saving`; persist the rate, then call
    /// [`Calibration::finish`].
    Save { rate_per_ms: f64 },
    /// Measurement ended without a single sample; the session is over.
    NoData,
}

#[derive(Debug, Default)]
pub struct Calibration {
    phase: Phase,
    requested_at: Option<Instant>,
    next_milestone: usize,
    start_yaw: Option<f64>,
}

impl Calibration {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Camera output is muted for the whole session, arming included.
    pub fn suppresses_output(&self) -> bool {
        self.is_active()
    }

    pub fn start_yaw(&self) -> Option<f64> {
        self.start_yaw
    }

    pub fn request(&mut self, now: Instant) -> Result<(), TrackerError> {
        if self.is_active() {
            return Err(TrackerError::CalibrationInProgress);
        }
        self.phase = Phase::Armed;
        self.requested_at = Some(now);
        self.next_milestone = 0;
        self.start_yaw = None;
        Ok(())
    }

    /// Captures the first yaw seen once measuring has begun.
    pub fn observe(&mut self, yaw: f64) {
        if self.phase == Phase::Measuring && self.start_yaw.is_none() {
            self.start_yaw = Some(yaw);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Armed | Phase::Measuring => {
                let requested_at = self.requested_at?;
                let (offset, _) = SCHEDULE.get(self.next_milestone)?;
                Some(requested_at + *offset)
            }
            Phase::Idle | Phase::Saving => None,
        }
    }

    /// Fires at most one due milestone; call repeatedly until `None`.
    pub fn advance(&mut self, now: Instant, current_yaw: f64) -> Option<CalibrationStep> {
        self.fire(now, current_yaw, true)
    }

    /// Like [`Calibration::advance`], but a session end falling exactly on
    /// `now` stays pending so a sample stamped at the deadline is measured.
    pub fn advance_before_input(
        &mut self,
        now: Instant,
        current_yaw: f64,
    ) -> Option<CalibrationStep> {
        self.fire(now, current_yaw, false)
    }

    fn fire(
        &mut self,
        now: Instant,
        current_yaw: f64,
        finish_at_now: bool,
    ) -> Option<CalibrationStep> {
        let deadline = self.next_deadline()?;
        let (_, milestone) = SCHEDULE[self.next_milestone];
        let due = match milestone {
            Milestone::Finish if !finish_at_now => now > deadline,
            _ => now >= deadline,
        };
        if !due {
            return None;
        }
        self.next_milestone += 1;

        match milestone {
            Milestone::BeginMeasuring => {
                self.phase = Phase::Measuring;
                self.start_yaw = None;
                Some(CalibrationStep::Measuring)
            }
            Milestone::Remaining(seconds) => Some(CalibrationStep::Remaining { seconds }),
            Milestone::Finish => match self.start_yaw {
                Some(start_yaw) => {
                    self.phase = Phase::Saving;
                    Some(CalibrationStep::Save {
                        rate_per_ms: measured_rate(start_yaw, current_yaw),
                    })
                }
                None => {
                    self.reset();
                    Some(CalibrationStep::NoData)
                }
            },
        }
    }

    /// Ends a `Saving` session whatever the outcome of the write was.
    pub fn finish(&mut self) {
        self.reset();
    }

    /// Abandons any session; returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.reset();
        was_active
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Folds a yaw difference into `(-π, π]`, correcting a single wrap only.
pub fn normalize_delta(delta: f64) -> f64 {
    if delta > PI {
        delta - TAU
    } else if delta <= -PI {
        delta + TAU
    } else {
        delta
    }
}

pub fn measured_rate(start_yaw: f64, end_yaw: f64) -> f64 {
    normalize_delta(end_yaw - start_yaw) / MEASUREMENT_WINDOW.as_millis() as f64
}

#[cfg(test)]
#[path = "tests/calibration_tests.rs"]
mod tests;
