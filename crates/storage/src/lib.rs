use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use shared::domain::CamVector;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Fractional digits written for a persisted drift rate.
const DRIFT_PRECISION: usize = 11;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to create parent directory '{}': {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to encode recording: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable home of the single drift rate, in radians per millisecond.
#[async_trait]
pub trait DriftStore: Send + Sync {
    /// `Ok(None)` when nothing usable has been stored yet.
    async fn load(&self) -> Result<Option<f64>>;
    async fn save(&self, rate_per_ms: f64) -> Result<()>;
}

/// Destination for a completed test recording.
#[async_trait]
pub trait RecordingSink: Send + Sync {
    async fn write(&self, vectors: &[CamVector]) -> Result<()>;
    /// Human-readable location used in status messages.
    fn location(&self) -> String;
}

pub fn format_drift(rate_per_ms: f64) -> String {
    format!("{rate_per_ms:.prec$}", prec = DRIFT_PRECISION)
}

pub fn parse_drift(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|rate| rate.is_finite())
}

#[derive(Debug, Clone)]
pub struct FileDriftStore {
    path: PathBuf,
}

impl FileDriftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DriftStore for FileDriftStore {
    async fn load(&self) -> Result<Option<f64>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let rate = parse_drift(&raw);
        if rate.is_none() {
            warn!(path = %self.path.display(), "ignoring unparseable drift value");
        }
        Ok(rate)
    }

    async fn save(&self, rate_per_ms: f64) -> Result<()> {
        ensure_parent_dir_exists(&self.path).await?;
        fs::write(&self.path, format_drift(rate_per_ms))
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), rate_per_ms, "drift rate persisted");
        Ok(())
    }
}

/// Writes recordings as a JSON array of `[x, y, z]` triples.
#[derive(Debug, Clone)]
pub struct JsonRecordingFile {
    path: PathBuf,
}

impl JsonRecordingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordingSink for JsonRecordingFile {
    async fn write(&self, vectors: &[CamVector]) -> Result<()> {
        let body = serde_json::to_vec(vectors)?;
        ensure_parent_dir_exists(&self.path).await?;
        fs::write(&self.path, body)
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), frames = vectors.len(), "recording written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

async fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent)
        .await
        .map_err(|source| StorageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
