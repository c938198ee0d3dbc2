//! Editor camera state.

use serde::{Deserialize, Serialize};

/// Perspective camera as persisted in editor snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [0.0, 5.0, 10.0],
            target: [0.0, 0.0, 0.0],
            fov: 50.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: [f32; 3]) -> Self {
        self.target = target;
        self
    }
}
