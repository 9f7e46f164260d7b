use panorama_types::alignment::AlignmentEdge;
use panorama_types::frame::{Frame, FrameId};
use panorama_types::intrinsics::Intrinsics;

/// Per-ring successor Δφ cycle sum, then `f_adj = 1 / (1 − d/2π)`
/// averaged across rings, applied to every frame's intrinsics (§4.7 step
/// 5, optional).
///
/// `rings` holds each ring's frame ids in graph (successor) order;
/// `edges` is the alignment graph after the global solve (successor
/// Δφ is read straight from its registered correlation edge, not
/// re-derived).
pub fn refine_focal_length(rings: &[Vec<FrameId>], edges: &[AlignmentEdge], frames: &mut [Frame]) {
    let mut factors = Vec::new();
    for ring in rings {
        let n = ring.len();
        if n < 2 {
            continue;
        }
        let mut drift = 0.0;
        for k in 0..n {
            let from = ring[k];
            let to = ring[(k + 1) % n];
            if let Some(edge) = edges.iter().find(|e| e.from == from && e.to == to && e.valid) {
                drift += edge.d_phi;
            }
        }
        let denom = 1.0 - drift / std::f64::consts::TAU;
        if denom.abs() > 1e-6 {
            factors.push(1.0 / denom);
        }
    }
    if factors.is_empty() {
        return;
    }
    let mean_factor = factors.iter().sum::<f64>() / factors.len() as f64;

    for frame in frames.iter_mut() {
        let current = frame.intrinsics();
        let scaled = Intrinsics {
            fx: current.fx * mean_factor,
            fy: current.fy * mean_factor,
            cx: current.cx * mean_factor,
            cy: current.cy * mean_factor,
            width: current.width,
            height: current.height,
        };
        frame.set_intrinsics(scaled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_math::rotation::{rotation_y, to_4x4};
    use panorama_types::alignment::RejectReason;
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;

    fn frame() -> Frame {
        Frame::from_loaded(
            image::RgbImage::new(4, 4),
            to_4x4(rotation_y(0.0)),
            Intrinsics::new(800.0, 800.0, 2.0, 2.0, 4, 4),
            Exposure::default(),
        )
    }

    fn edge(from: FrameId, to: FrameId, d_phi: f64) -> AlignmentEdge {
        AlignmentEdge {
            from,
            to,
            d_phi,
            d_theta: 0.0,
            dx: 0.0,
            dy: 0.0,
            overlap_weight: 400.0,
            valid: true,
            reject_reason: RejectReason::None,
            forced: false,
            quartile: false,
        }
    }

    #[test]
    fn zero_drift_leaves_intrinsics_unchanged() {
        let mut frames = vec![frame(), frame(), frame()];
        let ids: Vec<FrameId> = frames.iter().map(|f| f.id).collect();
        let rings = vec![ids.clone()];
        let edges = vec![
            edge(ids[0], ids[1], std::f64::consts::TAU / 3.0),
            edge(ids[1], ids[2], std::f64::consts::TAU / 3.0),
            edge(ids[2], ids[0], std::f64::consts::TAU / 3.0),
        ];
        let before = frames[0].intrinsics();
        refine_focal_length(&rings, &edges, &mut frames);
        assert!((frames[0].intrinsics().fx - before.fx).abs() < 1e-9);
    }

    #[test]
    fn no_rings_is_a_noop() {
        let mut frames = vec![frame()];
        let before = frames[0].intrinsics();
        refine_focal_length(&[], &[], &mut frames);
        assert_eq!(frames[0].intrinsics(), before);
    }
}
