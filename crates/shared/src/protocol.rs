use serde::{Deserialize, Serialize};

use crate::{
    domain::{CamVector, CenterMode},
    error::{ApiError, ErrorCode},
};

/// Commands a subscriber may send to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    Center,
    Sphere,
    #[serde(rename = "powersaver")]
    PowerSaver(bool),
    Calibrate,
}

impl ClientCommand {
    /// Parses a text frame received from a subscriber.
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        serde_json::from_str(text).map_err(|err| {
            ApiError::new(
                ErrorCode::Validation,
                format!("unrecognized command: {err}"),
            )
        })
    }

    pub fn center_mode(&self) -> Option<CenterMode> {
        match self {
            Self::Center => Some(CenterMode::Plain),
            Self::Sphere => Some(CenterMode::Sphere),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Human-readable progress or diagnostic message.
    Status(String),
    Cam(CamVector),
    /// Sent only to the subscriber whose command was rejected.
    Error(ApiError),
}

impl ServerEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(message.into())
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
