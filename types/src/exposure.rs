use serde::{Deserialize, Serialize};

/// Per-frame exposure triple captured alongside the pose (§3 data model).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub iso: f32,
    pub exposure_time: f32,
    pub gains: [f32; 3],
}

impl Default for Exposure {
    fn default() -> Self {
        Self {
            iso: 100.0,
            exposure_time: 1.0 / 60.0,
            gains: [1.0, 1.0, 1.0],
        }
    }
}
