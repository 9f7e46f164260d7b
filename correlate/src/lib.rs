//! Pairwise frame correlation (§4.2): spherical overlap extraction and a
//! pyramid planar aligner, converting the resulting pixel offset into an
//! angular offset usable by the alignment graph.

pub mod buffer;
pub mod overlap;
pub mod pyramid;

use panorama_types::alignment::RejectReason;
use panorama_types::error::StitchResult;
use panorama_types::frame::Frame;

pub use overlap::{canvas_for_intrinsics, footprint, MIN_OVERLAP_DIM};
pub use pyramid::AlignResult;

/// Outcome of correlating two frames (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct CorrelationResult {
    pub valid: bool,
    pub pixel_offset: (i32, i32),
    /// `(d_phi, d_theta)` in radians.
    pub angular_offset: (f64, f64),
    pub overlap_pixels: u32,
    pub correlation_variance: f64,
    pub reject_reason: RejectReason,
}

impl CorrelationResult {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            pixel_offset: (0, 0),
            angular_offset: (0.0, 0.0),
            overlap_pixels: 0,
            correlation_variance: 0.0,
            reject_reason: reason,
        }
    }
}

/// Default buffer, in canvas pixels, added around the intersection of the
/// two frames' footprints before correlating (§4.2 "configurable
/// margins").
pub const DEFAULT_MARGIN: f64 = 8.0;

/// Minimum top-level variance required to accept a correlation result
/// (§4.2: "the deviation-test rejection triggers when the top-level
/// variance falls below 1.5").
pub const DEVIATION_VARIANCE_THRESHOLD: f64 = 1.5;

/// Correlates two frames: warps both onto a shared spherical patch,
/// extracts the overlap, runs the pyramid planar aligner, and converts the
/// winning pixel offset into an angular offset. `window_fraction` controls
/// how much of the overlap the aligner searches (§4.2 default is 0.5 of
/// the overlap width/height; the ring closer's "forceWholeImage" mode asks
/// for the full overlap instead, see [`correlate_with_window`]).
pub fn correlate(a: &Frame, b: &Frame, margin: f64) -> StitchResult<CorrelationResult> {
    correlate_with_window(a, b, margin, 0.5)
}

pub fn correlate_with_window(a: &Frame, b: &Frame, margin: f64, window_fraction: f64) -> StitchResult<CorrelationResult> {
    let overlap = match overlap::extract_overlap(a, b, margin)? {
        Some(overlap) => overlap,
        None => return Ok(CorrelationResult::rejected(RejectReason::NoOverlap)),
    };

    let width = overlap.a.width as i32;
    let height = overlap.a.height as i32;
    let window = (
        (width as f64 * window_fraction).round().max(1.0) as i32,
        (height as f64 * window_fraction).round().max(1.0) as i32,
    );

    let result = pyramid::align(&overlap.a, &overlap.b, window);

    if result.offset.0.abs() > window.0 || result.offset.1.abs() > window.1 {
        return Ok(CorrelationResult::rejected(RejectReason::OutOfWindow));
    }
    if result.variance < DEVIATION_VARIANCE_THRESHOLD {
        return Ok(CorrelationResult::rejected(RejectReason::DeviationTest));
    }

    let ia = a.intrinsics();
    let ib = b.intrinsics();
    let (hfov_a, vfov_a) = ia.fov();
    let (hfov_b, vfov_b) = ib.fov();
    let hfov = (hfov_a + hfov_b) / 2.0;
    let vfov = (vfov_a + vfov_b) / 2.0;

    let d_phi = (((result.offset.0 as f64 / width as f64) * hfov.sin()).clamp(-1.0, 1.0)).asin();
    let d_theta = (((result.offset.1 as f64 / height as f64) * vfov.sin()).clamp(-1.0, 1.0)).asin();

    Ok(CorrelationResult {
        valid: true,
        pixel_offset: result.offset,
        angular_offset: (d_phi, d_theta),
        overlap_pixels: (width * height).max(0) as u32,
        correlation_variance: result.variance,
        reject_reason: RejectReason::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use panorama_math::rotation::{rotation_y, to_4x4};
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;

    fn textured_frame(yaw: f64) -> Frame {
        let mut image = RgbImage::new(320, 240);
        for y in 0..240 {
            for x in 0..320 {
                let v = (((x * 7 + y * 13) % 251) as u8).wrapping_add(20);
                image.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        let intrinsics = Intrinsics::new(260.0, 260.0, 160.0, 120.0, 320, 240);
        Frame::from_loaded(image, to_4x4(rotation_y(yaw)), intrinsics, Exposure::default())
    }

    #[test]
    fn correlating_overlapping_textured_frames_succeeds() {
        let a = textured_frame(0.0);
        let b = textured_frame(0.25);
        let result = correlate(&a, &b, DEFAULT_MARGIN).unwrap();
        assert!(result.valid, "reject reason: {:?}", result.reject_reason);
        assert_eq!(result.reject_reason, RejectReason::None);
    }

    #[test]
    fn correlating_disjoint_frames_rejects_no_overlap() {
        let a = textured_frame(0.0);
        let b = textured_frame(std::f64::consts::PI);
        let result = correlate(&a, &b, DEFAULT_MARGIN).unwrap();
        assert!(!result.valid);
        assert_eq!(result.reject_reason, RejectReason::NoOverlap);
    }

    #[test]
    fn correlating_flat_frames_fails_deviation_test() {
        let mut image = RgbImage::new(320, 240);
        for px in image.pixels_mut() {
            *px = Rgb([128, 128, 128]);
        }
        let intrinsics = Intrinsics::new(260.0, 260.0, 160.0, 120.0, 320, 240);
        let a = Frame::from_loaded(image.clone(), to_4x4(rotation_y(0.0)), intrinsics, Exposure::default());
        let b = Frame::from_loaded(image, to_4x4(rotation_y(0.2)), intrinsics, Exposure::default());
        let result = correlate(&a, &b, DEFAULT_MARGIN).unwrap();
        assert!(!result.valid);
        assert_eq!(result.reject_reason, RejectReason::DeviationTest);
    }
}
