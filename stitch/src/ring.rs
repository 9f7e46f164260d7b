use image::RgbImage;

use panorama_blend::{calculate_flow, FlowBlender, FlowField};
use panorama_correlate::canvas_for_intrinsics;
use panorama_math::rotation::to_4x4;
use panorama_types::error::StitchResult;
use panorama_types::exposure::Exposure;
use panorama_types::frame::Frame;
use panorama_types::graph::SelectionPoint;
use panorama_types::intrinsics::Intrinsics;
use panorama_types::stitched_ring::StitchedRing;

use crate::warp::{warp_frame, Warped};

/// Rows cropped from the top and bottom of the finalized ring to remove
/// projection artifacts at the poles of the warp (§4.10 `finalize`).
const FINALIZE_CROP_ROWS: u32 = 8;

const OVERLAP_MARGIN: f64 = 4.0;

struct Pending {
    image: RgbImage,
    corner: (i64, i64),
}

/// Asynchronous single-ring stitcher (§4.10). Frames are pushed one at a
/// time; internally a length-1 sliding window holds the previous warped
/// frame so each `push` can seam+blend it against the new arrival before
/// it is itself held for the next pair. The actual task/channel wiring
/// that makes `push` backpressure-aware lives in `panorama-pipeline`;
/// this type is the synchronous algorithmic core it drives.
pub struct RingStitcher {
    ring_id: u32,
    canvas_width: u32,
    roi_origin: (i64, i64),
    blender: FlowBlender,
    prev: Option<Pending>,
    use_flow: bool,
}

impl RingStitcher {
    /// `points` are the ring's target viewpoints (used only to size the
    /// canvas ROI before any real frame arrives); `intrinsics` is the
    /// working-resolution camera intrinsics shared by every frame on this
    /// ring (§4.10 "Construction").
    pub fn new(points: &[SelectionPoint], intrinsics: Intrinsics, ring_id: u32, use_flow: bool) -> Self {
        let canvas = canvas_for_intrinsics(&intrinsics);
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i64::MAX, i64::MAX, i64::MIN, i64::MIN);
        for point in points {
            let probe = Frame::from_loaded(
                RgbImage::new(intrinsics.width, intrinsics.height),
                to_4x4(point.extrinsics),
                intrinsics,
                Exposure::default(),
            );
            let warped = warp_frame(&probe, canvas, OVERLAP_MARGIN);
            min_x = min_x.min(warped.corner.0);
            min_y = min_y.min(warped.corner.1);
            max_x = max_x.max(warped.corner.0 + warped.image.width() as i64);
            max_y = max_y.max(warped.corner.1 + warped.image.height() as i64);
        }
        if min_x > max_x {
            (min_x, min_y, max_x, max_y) = (0, 0, canvas.width as i64, canvas.height as i64);
        }

        let roi_width = (max_x - min_x).max(1) as u32;
        let roi_height = (max_y - min_y).max(1) as u32;
        Self {
            ring_id,
            canvas_width: canvas.width,
            roi_origin: (min_x, min_y),
            blender: FlowBlender::new(roi_width, roi_height),
            prev: None,
            use_flow,
        }
    }

    /// Warps `frame` onto the ring canvas and, if a previous frame is
    /// pending in the sliding window, computes flow between them and
    /// feeds the previous frame into the blender (§4.10 `push`).
    pub fn push(&mut self, frame: &Frame) -> StitchResult<()> {
        frame.load()?;
        let canvas = panorama_math::sphere::EquirectCanvas {
            width: self.canvas_width,
            height: self.canvas_width / 2,
        };
        let warped = warp_frame(frame, canvas, OVERLAP_MARGIN);
        self.advance(warped);
        Ok(())
    }

    fn advance(&mut self, warped: Warped) {
        let roi_corner = (warped.corner.0 - self.roi_origin.0, warped.corner.1 - self.roi_origin.1);
        if let Some(prev) = self.prev.take() {
            let flow = if self.use_flow {
                let offset_hint = ((roi_corner.0 - prev.corner.0) as f64, (roi_corner.1 - prev.corner.1) as f64);
                calculate_flow(&prev.image, &warped.image, offset_hint, self.canvas_width)
            } else {
                FlowField::zero(prev.image.width(), prev.image.height())
            };
            self.blender.feed(&prev.image, &flow, prev.corner);
        }
        self.prev = Some(Pending {
            image: warped.image,
            corner: roi_corner,
        });
    }

    /// Flushes the pending frame and crops the projection artifacts at
    /// the top/bottom of the composited ring (§4.10 `finalize`).
    pub fn finalize(mut self) -> StitchedRing {
        if let Some(prev) = self.prev.take() {
            self.blender.feed(&prev.image, &FlowField::zero(prev.image.width(), prev.image.height()), prev.corner);
        }
        let (image, mask) = self.blender.into_result();
        let height = image.height();
        if height <= FINALIZE_CROP_ROWS * 2 {
            return StitchedRing {
                image,
                mask,
                corner: self.roi_origin,
                ring_id: self.ring_id,
                seamed: false,
            };
        }
        let cropped_height = height - FINALIZE_CROP_ROWS * 2;
        let image = image::imageops::crop_imm(&image, 0, FINALIZE_CROP_ROWS, image.width(), cropped_height).to_image();
        let mask = image::imageops::crop_imm(&mask, 0, FINALIZE_CROP_ROWS, mask.width(), cropped_height).to_image();
        StitchedRing {
            image,
            mask,
            corner: (self.roi_origin.0, self.roi_origin.1 + FINALIZE_CROP_ROWS as i64),
            ring_id: self.ring_id,
            seamed: false,
        }
    }
}
