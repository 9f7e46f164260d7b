use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use panorama_types::frame::{Frame, FrameId};

use crate::graph::AlignmentGraph;

/// Weight of the diagonal self-term relative to the off-diagonal coupling
/// term in the global linear system (§4.6: "alpha=2, beta=1/alpha").
const ALPHA: f64 = 2.0;
const BETA: f64 = 1.0 / ALPHA;

/// Per-frame Y-rotation correction produced by the global solve.
#[derive(Debug, Default)]
pub struct Solution {
    offsets: HashMap<FrameId, f64>,
}

impl Solution {
    pub fn get(&self, id: FrameId) -> f64 {
        *self.offsets.get(&id).unwrap_or(&0.0)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Builds and solves the global linear system `O x = R` over every
/// non-quartile edge (§4.6 "Global solve"). Call
/// [`AlignmentGraph::flag_quartile_outliers`] first so outliers are
/// excluded.
pub fn solve(graph: &AlignmentGraph) -> Solution {
    let ids = graph.frame_ids();
    let n = ids.len();
    if n == 0 {
        return Solution::default();
    }
    let index: HashMap<FrameId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut o = DMatrix::<f64>::zeros(n, n);
    let mut r = DVector::<f64>::zeros(n);

    for edge in graph.edges() {
        if !edge.valid || edge.quartile {
            continue;
        }
        let from = index[&edge.from];
        let to = index[&edge.to];
        let w = edge.overlap_weight;
        o[(from, to)] += BETA * w;
        o[(from, from)] += ALPHA * w;
        r[from] += 2.0 * w * edge.d_phi;
    }

    let svd = o.clone().svd(true, true);
    let x = svd
        .solve(&r, 1e-9)
        .unwrap_or_else(|_| DVector::zeros(n));

    let offsets = ids.iter().enumerate().map(|(i, &id)| (id, x[i])).collect();
    Solution { offsets }
}

/// Applies the solution to each frame's adjusted pose, then commits it to
/// the original pose for downstream stitchers (§4.6 "Apply", §4.7 step 3).
pub fn apply(frames: &mut [Frame], solution: &Solution) {
    for frame in frames.iter_mut() {
        let correction = panorama_math::rotation::rotation_y(solution.get(frame.id));
        let rotated = panorama_math::rotation::with_rotation(
            frame.adjusted_pose(),
            correction * panorama_math::rotation::rotation_of(&frame.adjusted_pose()),
        );
        frame.set_adjusted_pose(rotated);
        frame.commit_adjusted_to_original();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use panorama_math::rotation::to_4x4;
    use panorama_types::alignment::RejectReason;
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;
    use panorama_correlate::CorrelationResult;

    fn ok_result(d_phi: f64) -> CorrelationResult {
        CorrelationResult {
            valid: true,
            pixel_offset: (0, 0),
            angular_offset: (d_phi, 0.0),
            overlap_pixels: 400,
            correlation_variance: 3.0,
            reject_reason: RejectReason::None,
        }
    }

    fn blank_frame() -> Frame {
        Frame::from_loaded(
            RgbImage::new(4, 4),
            to_4x4(panorama_math::rotation::rotation_y(0.0)),
            Intrinsics::new(800.0, 800.0, 2.0, 2.0, 4, 4),
            Exposure::default(),
        )
    }

    #[test]
    fn symmetric_two_frame_graph_solves_near_zero() {
        let a = blank_frame();
        let b = blank_frame();
        let mut graph = AlignmentGraph::new();
        graph.insert_correlation(a.id, b.id, &ok_result(0.02));
        graph.flag_quartile_outliers();
        let solution = solve(&graph);
        assert!((solution.get(a.id) + solution.get(b.id)).abs() < 1e-6);
    }

    #[test]
    fn empty_graph_yields_empty_solution() {
        let graph = AlignmentGraph::new();
        let solution = solve(&graph);
        assert!(solution.is_empty());
    }
}
