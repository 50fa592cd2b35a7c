use shared::domain::{CamVector, CenterMode};
use tokio::time::Instant;

use crate::frame::OrientationSample;

/// Raw orientation treated as zero since the last center request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TareReference {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub captured_at: Instant,
}

impl TareReference {
    pub fn zero(now: Instant) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            captured_at: now,
        }
    }

    pub fn capture(raw: &OrientationSample, mode: CenterMode, now: Instant) -> Self {
        let (x, z) = match mode {
            CenterMode::Plain => (0.0, 0.0),
            CenterMode::Sphere => (raw.yaw, raw.roll),
        };
        Self {
            x,
            y: raw.pitch,
            z,
            captured_at: now,
        }
    }
}

/// Linear yaw drift, in radians per millisecond since the tare was taken.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriftModel {
    pub rate_per_ms: f64,
}

impl DriftModel {
    pub fn new(rate_per_ms: f64) -> Self {
        Self { rate_per_ms }
    }

    pub fn total_drift(&self, tare: &TareReference, now: Instant) -> f64 {
        let elapsed_ms = now.saturating_duration_since(tare.captured_at).as_secs_f64() * 1000.0;
        elapsed_ms * self.rate_per_ms
    }
}

pub fn normalize(
    sample: &OrientationSample,
    tare: &TareReference,
    drift: &DriftModel,
    now: Instant,
) -> CamVector {
    let total_drift = drift.total_drift(tare, now);
    CamVector::new(
        sample.yaw - tare.x,
        tare.y + total_drift - sample.pitch,
        tare.z - sample.roll,
    )
}

#[cfg(test)]
#[path = "tests/normalizer_tests.rs"]
mod tests;
