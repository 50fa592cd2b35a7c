/// One orientation reading from the sensor, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl OrientationSample {
    pub const ZERO: Self = Self {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }
}

/// Alternating flag attached to every parsed sample. The power saver drops
/// frames tagged `Skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Skip,
    Send,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Sample {
        sample: OrientationSample,
        parity: Parity,
    },
    /// The sensor is running but reports no usable orientation.
    LossOfSignal,
}

impl Frame {
    pub fn is_loss_of_signal(&self) -> bool {
        matches!(self, Self::LossOfSignal)
    }
}

/// Stateful line parser; the parity it hands out keeps alternating across
/// sensor restarts.
#[derive(Debug, Default)]
pub struct FrameParser {
    skip: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, line: &str) -> Frame {
        let Some(sample) = parse_sample(line) else {
            return Frame::LossOfSignal;
        };

        self.skip = !self.skip;
        let parity = if self.skip { Parity::Skip } else { Parity::Send };
        Frame::Sample { sample, parity }
    }
}

/// Reads yaw, pitch and roll from fields 1..=3 of a sensor line.
pub fn parse_sample(line: &str) -> Option<OrientationSample> {
    let mut fields = fields(line).skip(1);
    let yaw = parse_angle(fields.next())?;
    let pitch = parse_angle(fields.next())?;
    let roll = parse_angle(fields.next())?;
    Some(OrientationSample { yaw, pitch, roll })
}

// Runs of whitespace separate fields; leading whitespace produces an empty
// field 0.
fn fields(line: &str) -> impl Iterator<Item = &str> {
    let leading_blank = line.starts_with(char::is_whitespace);
    std::iter::once("")
        .filter(move |_| leading_blank)
        .chain(line.split_whitespace())
}

fn parse_angle(field: Option<&str>) -> Option<f64> {
    field?.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
#[path = "tests/frame_tests.rs"]
mod tests;
