use std::{io, process::Stdio, time::Duration};

use async_trait::async_trait;
use futures::{
    future,
    stream::{self, BoxStream},
    StreamExt,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{ChildStderr, Command},
    sync::mpsc,
};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

use crate::{
    engine::TrackerInput,
    error::TrackerError,
    frame::{Frame, FrameParser},
};

/// Wait between a sensor exit (or failed launch) and the next launch.
pub const RESPAWN_DELAY: Duration = Duration::from_secs(3);

/// Output lines of one sensor run; the stream ends when the sensor exits.
pub type LineStream = BoxStream<'static, io::Result<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Frame(Frame),
    Exited,
    LaunchFailed { sensor: String, error: String },
}

#[async_trait]
pub trait SensorLauncher: Send + Sync {
    fn name(&self) -> &str;
    async fn launch(&self) -> io::Result<LineStream>;
}

/// Runs the sensor as a child process and reads its stdout.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a configured command line on whitespace.
    pub fn from_command_line(command_line: &str) -> Result<Self, TrackerError> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next().ok_or(TrackerError::EmptySensorCommand)?;
        Ok(Self::new(program, parts.collect()))
    }
}

#[async_trait]
impl SensorLauncher for CommandLauncher {
    fn name(&self) -> &str {
        &self.program
    }

    async fn launch(&self) -> io::Result<LineStream> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sensor stdout not captured"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(self.program.clone(), stderr));
        }

        let program = self.program.clone();
        let reap = stream::once(async move {
            match child.wait().await {
                Ok(status) => debug!(sensor = %program, %status, "sensor process exited"),
                Err(error) => warn!(sensor = %program, %error, "failed to reap sensor process"),
            }
            None::<io::Result<String>>
        })
        .filter_map(future::ready);

        let lines = LinesStream::new(BufReader::new(stdout).lines());
        Ok(lines.chain(reap).boxed())
    }
}

async fn forward_stderr(program: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(sensor = %program, "stderr: {line}");
    }
}

/// Keeps exactly one sensor run alive, relaunching it after every exit.
pub struct Supervisor<L> {
    launcher: L,
    parser: FrameParser,
    respawn_delay: Duration,
}

impl<L: SensorLauncher> Supervisor<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            parser: FrameParser::new(),
            respawn_delay: RESPAWN_DELAY,
        }
    }

    pub fn with_respawn_delay(mut self, respawn_delay: Duration) -> Self {
        self.respawn_delay = respawn_delay;
        self
    }

    /// Retries forever; returns only once the tracker stops listening.
    pub async fn run(mut self, inputs: mpsc::Sender<TrackerInput>) {
        loop {
            let ended = match self.launcher.launch().await {
                Ok(lines) => {
                    info!(sensor = self.launcher.name(), "sensor process started");
                    if !self.pump(lines, &inputs).await {
                        break;
                    }
                    SensorEvent::Exited
                }
                Err(err) => {
                    warn!(sensor = self.launcher.name(), %err, "sensor process failed to start");
                    SensorEvent::LaunchFailed {
                        sensor: self.launcher.name().to_owned(),
                        error: err.to_string(),
                    }
                }
            };

            if inputs.send(TrackerInput::Sensor(ended)).await.is_err() {
                break;
            }
            debug!(delay_ms = self.respawn_delay.as_millis() as u64, "sensor respawn scheduled");
            tokio::time::sleep(self.respawn_delay).await;
        }
        debug!("tracker gone; sensor supervisor stopping");
    }

    // Returns false when the tracker has gone away.
    async fn pump(&mut self, mut lines: LineStream, inputs: &mpsc::Sender<TrackerInput>) -> bool {
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(sensor = self.launcher.name(), %err, "sensor output unreadable");
                    break;
                }
            };
            let frame = self.parser.parse(&line);
            if inputs
                .send(TrackerInput::Sensor(SensorEvent::Frame(frame)))
                .await
                .is_err()
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
