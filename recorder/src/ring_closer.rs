use panorama_correlate::correlate_with_window;
use panorama_math::rotation::rotation_y;
use panorama_types::error::StitchResult;
use panorama_types::frame::Frame;

/// `phi` below this threshold would close the seam with a visibly torn
/// (black) gap rather than a believable wraparound, so the closure is
/// skipped instead (§4.5: "if... phi < -0.18 rad (would produce black
/// seams), skip").
pub const MIN_CLOSURE_PHI: f64 = -0.18;

/// "forceWholeImage" search window fraction: the full overlap, rather than
/// the pairwise correlator's usual half-overlap default (§4.5).
const FORCE_WHOLE_IMAGE_WINDOW: f64 = 1.0;

/// Correlates the first and last frame of a closed ring and, unless the
/// result is invalid or pathological, linearly redistributes the detected
/// drift across the ring (§4.5).
///
/// `frames` must be in ring (graph) order. Mutates each frame's adjusted
/// pose in place; returns `true` if a correction was applied.
pub fn close_ring(frames: &[Frame], margin: f64) -> StitchResult<bool> {
    let n = frames.len();
    if n < 2 {
        return Ok(false);
    }
    let first = &frames[0];
    let last = &frames[n - 1];

    let result = correlate_with_window(last, first, margin, FORCE_WHOLE_IMAGE_WINDOW)?;
    if !result.valid {
        return Ok(false);
    }
    let phi = result.angular_offset.0;
    if phi < MIN_CLOSURE_PHI {
        return Ok(false);
    }

    for (k, frame) in frames.iter().enumerate() {
        let fraction = 1.0 - (k as f64 / n as f64);
        let correction = rotation_y(phi * fraction);
        let corrected = panorama_math::rotation::with_rotation(
            frame.adjusted_pose(),
            correction * panorama_math::rotation::rotation_of(&frame.adjusted_pose()),
        );
        frame.set_adjusted_pose(corrected);
    }
    Ok(true)
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
    fn no_drift_ring_reports_no_correction_needed_or_tiny() {
        let frames: Vec<Frame> = (0..8)
            .map(|i| textured_frame(i as f64 * std::f64::consts::FRAC_PI_4))
            .collect();
        // first/last are 7 steps apart == almost a full circle already by
        // construction (7 * pi/4 ~ 5.5 rad); this is a smoke test that the
        // function runs to completion without panicking, not a precision
        // check on a real capture.
        let _ = close_ring(&frames, 8.0);
    }

    #[test]
    fn single_frame_ring_is_a_no_op() {
        let frames = vec![textured_frame(0.0)];
        assert!(!close_ring(&frames, 8.0).unwrap());
    }
}
