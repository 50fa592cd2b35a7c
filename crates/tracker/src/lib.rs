//! Head-tracker core: turns the text stream of an external orientation sensor
//! into tared, drift-corrected camera vectors and runs the timed calibration
//! and recording sessions around it.
//!
//! All mutable state lives in [`Tracker`], which is driven from a single task.
//! The [`Supervisor`] owns the sensor process and feeds parsed frames into
//! that task's input queue.

pub mod calibration;
pub mod engine;
pub mod error;
pub mod frame;
pub mod normalizer;
pub mod power_saver;
pub mod recorder;
pub mod supervisor;

pub use engine::{Tracker, TrackerInput};
pub use error::TrackerError;
pub use frame::{Frame, FrameParser, OrientationSample, Parity};
pub use normalizer::{normalize, DriftModel, TareReference};
pub use supervisor::{CommandLauncher, SensorEvent, SensorLauncher, Supervisor};

/// Capacity of the tracker's input queue.
pub const INPUT_CAPACITY: usize = 256;
