use panorama_math::rotation::{rotation_x, rotation_y};
use panorama_types::graph::{RecorderGraph, Ring, SelectionEdge, SelectionPoint};
use panorama_types::intrinsics::Intrinsics;
use panorama_types::mode::RecorderMode;

/// Default horizontal/vertical overlap fractions used to derive ring
/// spacing and ring size (§4.3).
pub const DEFAULT_HORIZONTAL_OVERLAP: f64 = 0.9;
pub const DEFAULT_VERTICAL_OVERLAP: f64 = 0.25;

/// Generates the full-sphere recorder graph for the given intrinsics, then
/// applies the mode's ring truncation (§4.3).
pub fn generate(intrinsics: &Intrinsics, mode: RecorderMode) -> RecorderGraph {
    let (h_fov, v_fov) = intrinsics.fov();
    let ring_spacing = v_fov * (1.0 - DEFAULT_VERTICAL_OVERLAP);
    let n_center = (2.0 * std::f64::consts::PI / (h_fov * (1.0 - DEFAULT_HORIZONTAL_OVERLAP)))
        .ceil()
        .max(3.0) as u32;

    let half = (std::f64::consts::FRAC_PI_2 / ring_spacing).ceil().max(0.0) as i64;
    let ring_count = 2 * half + 1;
    let center_index = half;

    let mut rings = Vec::with_capacity(ring_count as usize);
    let mut global_id = 0u32;
    for ring_idx in 0..ring_count {
        let v_center = (ring_idx - center_index) as f64 * ring_spacing;
        let ring_size = ((n_center as f64) * v_center.cos()).ceil().max(1.0) as u32;
        let h_fov_cell = 2.0 * std::f64::consts::PI / ring_size as f64;

        let mut points = Vec::with_capacity(ring_size as usize);
        let mut edges = Vec::with_capacity(ring_size as usize);
        for local_id in 0..ring_size {
            let h_angle = local_id as f64 * h_fov_cell;
            let extrinsics = rotation_y(h_angle) * rotation_x(v_center);
            points.push(SelectionPoint {
                global_id,
                local_id,
                ring_id: ring_idx as u32,
                ring_size,
                h_center: h_angle,
                v_center,
                h_fov: h_fov_cell,
                v_fov,
                extrinsics,
            });
            edges.push(SelectionEdge {
                from: local_id,
                to: (local_id + 1) % ring_size,
                recorded: false,
            });
            global_id += 1;
        }
        rings.push(Ring {
            ring_id: ring_idx as u32,
            points,
            edges,
        });
    }

    let graph = RecorderGraph { rings };
    apply_mode(graph, mode, center_index as usize)
}

fn apply_mode(graph: RecorderGraph, mode: RecorderMode, center_index: usize) -> RecorderGraph {
    let keep: Vec<usize> = match mode {
        RecorderMode::FullSphere => (0..graph.rings.len()).collect(),
        RecorderMode::CenterOnly => vec![center_index],
        RecorderMode::Truncated => {
            let mut idx = vec![center_index];
            if center_index > 0 {
                idx.push(center_index - 1);
            }
            if center_index + 1 < graph.rings.len() {
                idx.push(center_index + 1);
            }
            idx.sort_unstable();
            idx
        }
        RecorderMode::NoBottom => (0..graph.rings.len().saturating_sub(1)).collect(),
    };

    renumber(
        keep.into_iter()
            .map(|i| graph.rings[i].clone())
            .collect::<Vec<_>>(),
    )
}

/// Reassigns contiguous `ring_id`/global ids after a ring subset or stride
/// filter, preserving the relative ordering of the surviving rings/points
/// (§4.3 "renumber global and local ids contiguously").
fn renumber(mut rings: Vec<Ring>) -> RecorderGraph {
    let mut global_id = 0u32;
    for (ring_idx, ring) in rings.iter_mut().enumerate() {
        ring.ring_id = ring_idx as u32;
        for point in ring.points.iter_mut() {
            point.ring_id = ring_idx as u32;
            point.global_id = global_id;
            global_id += 1;
        }
    }
    RecorderGraph { rings }
}

/// Keeps every `stride`-th point of each ring, rescales the surviving
/// points' horizontal field-of-view by `stride`, rebuilds the ring's
/// directed cycle over the kept points, and renumbers ids (§4.3
/// "Sparsification").
pub fn sparsify(graph: &RecorderGraph, stride: u32) -> RecorderGraph {
    assert!(stride >= 1, "sparsification stride must be >= 1");
    let rings = graph
        .rings
        .iter()
        .map(|ring| {
            let mut kept: Vec<SelectionPoint> = ring
                .points
                .iter()
                .enumerate()
                .filter(|(i, _)| *i as u32 % stride == 0)
                .map(|(_, p)| {
                    let mut p = *p;
                    p.h_fov *= stride as f64;
                    p
                })
                .collect();
            let size = kept.len() as u32;
            for (local_id, point) in kept.iter_mut().enumerate() {
                point.local_id = local_id as u32;
                point.ring_size = size;
            }
            let edges = (0..size)
                .map(|local_id| SelectionEdge {
                    from: local_id,
                    to: (local_id + 1) % size,
                    recorded: false,
                })
                .collect();
            Ring {
                ring_id: ring.ring_id,
                points: kept,
                edges,
            }
        })
        .collect();
    renumber(rings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsics() -> Intrinsics {
        Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960)
    }

    #[test]
    fn full_sphere_graph_validates() {
        let graph = generate(&intrinsics(), RecorderMode::FullSphere);
        graph.validate().expect("generated graph must validate");
        assert!(graph.rings.len() > 1);
    }

    #[test]
    fn center_only_has_single_ring() {
        let graph = generate(&intrinsics(), RecorderMode::CenterOnly);
        assert_eq!(graph.rings.len(), 1);
        graph.validate().unwrap();
    }

    #[test]
    fn truncated_has_three_rings() {
        let graph = generate(&intrinsics(), RecorderMode::Truncated);
        assert_eq!(graph.rings.len(), 3);
        graph.validate().unwrap();
    }

    #[test]
    fn ring_size_shrinks_towards_poles() {
        let graph = generate(&intrinsics(), RecorderMode::FullSphere);
        let center = graph.center_ring_index();
        let center_size = graph.rings[center].size();
        let outer_size = graph.rings[0].size();
        assert!(outer_size <= center_size);
    }

    #[test]
    fn sparsify_keeps_valid_graph_with_fewer_points() {
        let graph = generate(&intrinsics(), RecorderMode::FullSphere);
        let total_before = graph.total_points();
        let sparse = sparsify(&graph, 2);
        sparse.validate().unwrap();
        assert!(sparse.total_points() < total_before);
    }
}
