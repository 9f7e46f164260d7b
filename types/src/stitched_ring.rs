use image::{GrayImage, RgbImage};

/// A single blended, warped ring ready for multi-ring composition (§3).
#[derive(Debug, Clone)]
pub struct StitchedRing {
    pub image: RgbImage,
    pub mask: GrayImage,
    pub corner: (i64, i64),
    pub ring_id: u32,
    pub seamed: bool,
}
