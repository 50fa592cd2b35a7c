use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Calibration already in progress")]
    CalibrationInProgress,
    #[error("Recording already in progress")]
    RecordingInProgress,
    #[error("sensor command is empty")]
    EmptySensorCommand,
}
