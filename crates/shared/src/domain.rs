use serde::{Deserialize, Serialize};

/// Camera-space orientation pushed to subscribers, serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CamVector(pub [f64; 3]);

impl CamVector {
    pub const ZERO: Self = Self([0.0; 3]);

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    pub fn z(&self) -> f64 {
        self.0[2]
    }
}

/// How a `center` request anchors the tare reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterMode {
    /// Anchors the vertical axis only; the horizontal axes tare to zero.
    #[default]
    Plain,
    /// Anchors all three axes.
    Sphere,
}
