use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use panorama_types::exposure_edge::ExposureEdge;
use panorama_types::frame::FrameId;

/// Regularization pulling every gain toward 1.0, playing the same role
/// `ALPHA`/`BETA` play in the alignment solve's damped system (§4.7 step 4:
/// "a damped linear system"). Without it a connected component with no
/// absolute brightness reference is only determined up to a scale factor.
const GAIN_DAMPING: f64 = 0.3;

/// Overlap-weighted pairwise intensity comparisons feeding the exposure
/// compensation solve (§4.7 step 4).
#[derive(Debug, Default)]
pub struct ExposureGraph {
    edges: Vec<ExposureEdge>,
}

impl ExposureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge: ExposureEdge) {
        self.edges.push(edge);
    }

    pub fn edges(&self) -> &[ExposureEdge] {
        &self.edges
    }

    fn frame_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self
            .edges
            .iter()
            .flat_map(|e| [e.from, e.to])
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Per-frame scalar multiplicative gain produced by [`solve_exposure`].
#[derive(Debug, Default)]
pub struct ExposureSolution {
    gains: HashMap<FrameId, f64>,
}

impl ExposureSolution {
    pub fn get(&self, id: FrameId) -> f64 {
        *self.gains.get(&id).unwrap_or(&1.0)
    }
}

/// Minimizes `Σ w_ij (g_i·mean_i − g_j·mean_j)²` plus a damping term
/// pulling every gain toward 1, over the linear system `O g = R` (§4.7
/// step 4). Reuses the same `DMatrix`/`DVector`/SVD machinery as the
/// alignment global solve.
pub fn solve_exposure(graph: &ExposureGraph) -> ExposureSolution {
    let ids = graph.frame_ids();
    let n = ids.len();
    if n == 0 {
        return ExposureSolution::default();
    }
    let index: HashMap<FrameId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut o = DMatrix::<f64>::zeros(n, n);
    let mut r = DVector::<f64>::zeros(n);

    for edge in graph.edges() {
        let w = edge.overlap_pixels as f64;
        let i = index[&edge.from];
        let j = index[&edge.to];
        let mi = edge.mean_intensity_from;
        let mj = edge.mean_intensity_to;
        o[(i, i)] += w * mi * mi;
        o[(i, j)] -= w * mi * mj;
        o[(j, j)] += w * mj * mj;
        o[(j, i)] -= w * mi * mj;
    }
    for i in 0..n {
        o[(i, i)] += GAIN_DAMPING;
        r[i] += GAIN_DAMPING;
    }

    let svd = o.clone().svd(true, true);
    let x = svd.solve(&r, 1e-9).unwrap_or_else(|_| DVector::from_element(n, 1.0));

    let gains = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, x[i].max(0.01)))
        .collect();
    ExposureSolution { gains }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_intensity_pair_solves_near_unit_gain() {
        let mut graph = ExposureGraph::new();
        graph.insert(ExposureEdge {
            from: 1,
            to: 2,
            overlap_pixels: 500,
            mean_intensity_from: 120.0,
            mean_intensity_to: 120.0,
        });
        let solution = solve_exposure(&graph);
        assert!((solution.get(1) - 1.0).abs() < 0.2);
        assert!((solution.get(2) - 1.0).abs() < 0.2);
    }

    #[test]
    fn empty_graph_yields_default_unit_gain() {
        let graph = ExposureGraph::new();
        let solution = solve_exposure(&graph);
        assert_eq!(solution.get(42), 1.0);
    }

    #[test]
    fn darker_frame_receives_larger_gain_than_brighter_peer() {
        let mut graph = ExposureGraph::new();
        graph.insert(ExposureEdge {
            from: 1,
            to: 2,
            overlap_pixels: 500,
            mean_intensity_from: 80.0,
            mean_intensity_to: 160.0,
        });
        let solution = solve_exposure(&graph);
        assert!(solution.get(1) > solution.get(2));
    }
}
