use std::sync::Arc;

use shared::{
    domain::{CamVector, CenterMode},
    protocol::{ClientCommand, ServerEvent},
};
use storage::{DriftStore, RecordingSink};
use tokio::{
    sync::{broadcast, mpsc},
    time::{sleep_until, Instant},
};
use tracing::{debug, error, info};

use crate::{
    calibration::{Calibration, CalibrationStep, Phase},
    frame::{Frame, OrientationSample},
    normalizer::{normalize, DriftModel, TareReference},
    power_saver::PowerSaverGate,
    recorder::{RecorderStep, TestRecorder},
    supervisor::SensorEvent,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerInput {
    Sensor(SensorEvent),
    Command(ClientCommand),
    /// One-shot test recording.
    Record,
}

/// Sole owner of the tare, drift, connectivity and session state. Every
/// mutation goes through `&mut self` on the task that runs [`Tracker::run`].
pub struct Tracker {
    events: broadcast::Sender<ServerEvent>,
    drift_store: Arc<dyn DriftStore>,
    recording_sink: Arc<dyn RecordingSink>,
    raw: OrientationSample,
    tare: TareReference,
    drift: DriftModel,
    connected: bool,
    power_saver: PowerSaverGate,
    calibration: Calibration,
    recorder: TestRecorder,
}

impl Tracker {
    pub fn new(
        events: broadcast::Sender<ServerEvent>,
        drift_store: Arc<dyn DriftStore>,
        recording_sink: Arc<dyn RecordingSink>,
    ) -> Self {
        Self {
            events,
            drift_store,
            recording_sink,
            raw: OrientationSample::ZERO,
            tare: TareReference::zero(Instant::now()),
            drift: DriftModel::default(),
            connected: false,
            power_saver: PowerSaverGate::default(),
            calibration: Calibration::default(),
            recorder: TestRecorder::default(),
        }
    }

    pub fn drift(&self) -> DriftModel {
        self.drift
    }

    pub fn tare(&self) -> TareReference {
        self.tare
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn calibration_phase(&self) -> Phase {
        self.calibration.phase()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_capturing()
    }

    /// Loads the persisted drift rate. A forced run, or a missing or
    /// unreadable value, starts a calibration session.
    pub async fn bootstrap(&mut self, force_calibration: bool, now: Instant) {
        let needs_calibration = match self.drift_store.load().await {
            Ok(Some(rate_per_ms)) => {
                self.drift = DriftModel::new(rate_per_ms);
                info!(rate_per_ms, "drift rate loaded");
                false
            }
            Ok(None) => {
                if !force_calibration {
                    self.status("First time setup detected");
                }
                true
            }
            Err(err) => {
                error!(%err, "failed to load drift rate");
                self.status(format!("Drift rate could not be loaded: {err}"));
                true
            }
        };

        if force_calibration || needs_calibration {
            self.request_calibration(now);
        }
    }

    pub async fn run(mut self, mut inputs: mpsc::Receiver<TrackerInput>) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.step(input, Instant::now()).await;
                }
                _ = sleep_until_deadline(deadline) => {
                    // Inputs racing the deadline are stamped with it.
                    tokio::task::yield_now().await;
                    let now = Instant::now();
                    while let Ok(input) = inputs.try_recv() {
                        self.step(input, now).await;
                    }
                    self.tick(now).await;
                }
            }
        }
        debug!("tracker input closed");
    }

    /// Handles one input stamped `now`. Transitions due before `now` fire
    /// first, as do phase openings due exactly at `now`; a measurement or
    /// capture window closing at `now` still includes the input.
    pub async fn step(&mut self, input: TrackerInput, now: Instant) {
        self.settle(now).await;
        self.handle(input, now);
        self.tick(now).await;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.calibration.next_deadline(), self.recorder.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn handle(&mut self, input: TrackerInput, now: Instant) {
        match input {
            TrackerInput::Sensor(SensorEvent::Frame(frame)) => self.on_frame(frame, now),
            TrackerInput::Sensor(SensorEvent::Exited) => self.on_sensor_lost(),
            TrackerInput::Sensor(SensorEvent::LaunchFailed { sensor, error }) => {
                self.status(format!("Failed to start {sensor}: {error}"));
                self.on_sensor_lost();
            }
            TrackerInput::Command(command) => self.on_command(command, now),
            TrackerInput::Record => self.request_recording(now),
        }
    }

    /// Fires every calibration and recording transition due at `now`.
    pub async fn tick(&mut self, now: Instant) {
        while let Some(step) = self.calibration.advance(now, self.raw.yaw) {
            self.on_calibration_step(step).await;
        }
        while let Some(step) = self.recorder.advance(now) {
            self.on_recorder_step(step).await;
        }
    }

    async fn settle(&mut self, now: Instant) {
        while let Some(step) = self.calibration.advance_before_input(now, self.raw.yaw) {
            self.on_calibration_step(step).await;
        }
        while let Some(step) = self.recorder.advance_before_input(now) {
            self.on_recorder_step(step).await;
        }
    }

    async fn on_calibration_step(&mut self, step: CalibrationStep) {
        match step {
            CalibrationStep::Measuring => {
                self.status("Started yaw drift measurement. 55 seconds remaining")
            }
            CalibrationStep::Remaining { seconds } => {
                self.status(format!("{seconds} seconds remaining"))
            }
            CalibrationStep::Save { rate_per_ms } => self.save_drift(rate_per_ms).await,
            CalibrationStep::NoData => {
                self.status("Calibration failed: no sensor data during measurement")
            }
        }
    }

    async fn on_recorder_step(&mut self, step: RecorderStep) {
        match step {
            RecorderStep::Started => self.status("Started recording"),
            RecorderStep::Finished(vectors) => self.save_recording(vectors).await,
        }
    }

    fn on_frame(&mut self, frame: Frame, now: Instant) {
        let Frame::Sample { sample, .. } = frame else {
            self.raw = OrientationSample::ZERO;
            self.broadcast_cam(CamVector::ZERO);
            return;
        };

        self.raw = sample;
        if !self.connected {
            self.connected = true;
            self.tare = TareReference::capture(&sample, CenterMode::Plain, now);
            self.status("Headset connected");
        }
        self.calibration.observe(sample.yaw);

        if !self.power_saver.admits(&frame) {
            return;
        }
        let cam = normalize(&sample, &self.tare, &self.drift, now);
        self.broadcast_cam(cam);
    }

    fn on_sensor_lost(&mut self) {
        if self.connected {
            self.connected = false;
            self.status("Headset disconnected");
        }
        if self.calibration.cancel() {
            self.status("Calibration cancelled");
        }
        if self.recorder.cancel() {
            self.status("Recording cancelled");
        }
    }

    fn on_command(&mut self, command: ClientCommand, now: Instant) {
        match command {
            ClientCommand::Center | ClientCommand::Sphere => {
                let mode = command.center_mode().unwrap_or_default();
                self.tare = TareReference::capture(&self.raw, mode, now);
                debug!(?mode, "tare captured");
            }
            ClientCommand::PowerSaver(enabled) => {
                self.power_saver.set_enabled(enabled);
                info!(enabled = self.power_saver.is_enabled(), "power saver toggled");
            }
            ClientCommand::Calibrate => self.request_calibration(now),
        }
    }

    fn request_calibration(&mut self, now: Instant) {
        match self.calibration.request(now) {
            Ok(()) => self.status("Calibration starts in 5 seconds. UI motion paused for 1 minute"),
            Err(err) => self.status(err.to_string()),
        }
    }

    fn request_recording(&mut self, now: Instant) {
        match self.recorder.request(now) {
            Ok(()) => self.status("Recording 10 seconds of test data, starting in 10 seconds"),
            Err(err) => self.status(err.to_string()),
        }
    }

    fn broadcast_cam(&mut self, cam: CamVector) {
        if self.calibration.suppresses_output() {
            return;
        }
        // No subscribers is not an error.
        let _ = self.events.send(ServerEvent::Cam(cam));
        self.recorder.observe(cam);
    }

    async fn save_drift(&mut self, rate_per_ms: f64) {
        self.drift = DriftModel::new(rate_per_ms);
        match self.drift_store.save(rate_per_ms).await {
            Ok(()) => {
                info!(rate_per_ms, "drift rate calibrated");
                self.status("Calibration saved. Resuming UI motion");
            }
            Err(err) => {
                error!(%err, rate_per_ms, "failed to persist drift rate");
                self.status(format!("Calibration could not be saved: {err}"));
            }
        }
        self.calibration.finish();
    }

    async fn save_recording(&mut self, vectors: Vec<CamVector>) {
        match self.recording_sink.write(&vectors).await {
            Ok(()) => {
                let location = self.recording_sink.location();
                self.status(format!("Recording saved to {location}"));
            }
            Err(err) => {
                error!(%err, frames = vectors.len(), "failed to persist recording");
                self.status(format!("Recording could not be saved: {err}"));
            }
        }
    }

    fn status(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        let _ = self.events.send(ServerEvent::Status(message));
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
