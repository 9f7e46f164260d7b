use crate::frame::FrameId;

/// Overlap-weighted intensity comparison between two frames, feeding the
/// exposure compensation solve (§3, §4.7 step 4).
#[derive(Debug, Clone, Copy)]
pub struct ExposureEdge {
    pub from: FrameId,
    pub to: FrameId,
    pub overlap_pixels: u32,
    pub mean_intensity_from: f64,
    pub mean_intensity_to: f64,
}
