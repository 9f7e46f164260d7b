use serde::{Deserialize, Serialize};

/// Sidecar JSON next to `raw_images/<id>.bmp` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub intrinsics: [f64; 9],
    #[serde(rename = "adjustedExtrinsics")]
    pub adjusted_extrinsics: [f64; 16],
    #[serde(rename = "originalExtrinsics")]
    pub original_extrinsics: [f64; 16],
}

/// `rings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RingsDoc {
    pub rings: Vec<Vec<u64>>,
}

/// One entry of `exposure.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureEntry {
    pub id: u64,
    pub e: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExposureDoc {
    pub exposure: Vec<ExposureEntry>,
}

/// `offsets.json`: inter-ring Δy values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OffsetsDoc {
    pub offsets: Vec<i64>,
}

/// `rings/ring_<n>.data.json`, also reused verbatim for
/// `optograph/result.data.json` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingDataDoc {
    pub x: i64,
    pub y: i64,
    pub id: u32,
    pub seamed: bool,
    pub width: u32,
    pub height: u32,
}
