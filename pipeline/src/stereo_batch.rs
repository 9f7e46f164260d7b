use std::collections::HashMap;

use image::{GrayImage, RgbImage};

use panorama_stitch::{MultiRingStitcher, RingStitcher};
use panorama_types::error::StitchResult;
use panorama_types::frame::{Frame, FrameId};
use panorama_types::graph::RecorderGraph;
use panorama_types::intrinsics::Intrinsics;

/// Batch entry point for stitching an already-recorded graph's worth of
/// frames in one shot, bypassing the incremental `Recorder`/`RingStitcher`
/// push model (§4.12 [SUPPLEMENT]: "a caller holding a complete capture
/// set up front should not be forced through the streaming API").
pub struct StereoBatch;

impl StereoBatch {
    /// Stitches one frame per selection point (frames missing from
    /// `frames_by_point` simply leave a gap in their ring) into a single
    /// equirectangular panorama plus its coverage mask.
    pub fn stitch(
        graph: &RecorderGraph,
        frames_by_point: &HashMap<u32, Frame>,
        intrinsics: Intrinsics,
        use_flow: bool,
    ) -> StitchResult<(RgbImage, GrayImage)> {
        let mut stitched_rings = Vec::with_capacity(graph.rings.len());
        for ring in &graph.rings {
            let mut stitcher = RingStitcher::new(&ring.points, intrinsics, ring.ring_id, use_flow);
            for point in &ring.points {
                if let Some(frame) = frames_by_point.get(&point.global_id) {
                    stitcher.push(frame)?;
                }
            }
            stitched_rings.push(stitcher.finalize());
        }

        let mut multi = MultiRingStitcher::new(stitched_rings);
        multi.align_vertically();
        multi.seam_adjacent_rings();
        Ok(multi.composite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_math::rotation::{rotation_y, to_4x4};
    use panorama_types::exposure::Exposure;
    use panorama_types::mode::RecorderMode;

    fn textured_frame(yaw: f64, intrinsics: Intrinsics) -> Frame {
        let mut image = RgbImage::new(intrinsics.width, intrinsics.height);
        for y in 0..intrinsics.height {
            for x in 0..intrinsics.width {
                let v = (((x * 3 + y * 7) % 250) as u8) + 5;
                image.put_pixel(x, y, image::Rgb([v, v, v]));
            }
        }
        Frame::from_loaded(image, to_4x4(rotation_y(yaw)), intrinsics, Exposure::default())
    }

    #[test]
    fn stitching_an_empty_frame_map_still_returns_a_canvas() {
        let intrinsics = Intrinsics::new(180.0, 180.0, 100.0, 75.0, 200, 150);
        let graph = panorama_recorder::generate(&intrinsics, RecorderMode::CenterOnly);
        let frames = HashMap::new();
        let (image, _mask) = StereoBatch::stitch(&graph, &frames, intrinsics, false).unwrap();
        assert!(image.width() > 0 || graph.rings.is_empty());
    }

    #[test]
    fn stitching_one_frame_per_center_ring_point_produces_nonempty_coverage() {
        let intrinsics = Intrinsics::new(180.0, 180.0, 100.0, 75.0, 200, 150);
        let graph = panorama_recorder::generate(&intrinsics, RecorderMode::CenterOnly);
        let mut frames = HashMap::new();
        for ring in &graph.rings {
            for point in &ring.points {
                frames.insert(point.global_id, textured_frame(point.h_center, intrinsics));
            }
        }
        let (_image, mask) = StereoBatch::stitch(&graph, &frames, intrinsics, false).unwrap();
        assert!(mask.pixels().any(|p| p.0[0] != 0));
        let _: Vec<FrameId> = frames.values().map(|f| f.id).collect();
    }
}
