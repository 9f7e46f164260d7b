use std::collections::HashMap;

use panorama_correlate::CorrelationResult;
use panorama_types::alignment::AlignmentEdge;
use panorama_types::frame::FrameId;

/// Synthetic overlap weight given to "forced" neighbor-filler edges
/// (§4.6: "half-image overlap weight").
pub const FORCED_OVERLAP_WEIGHT: f64 = 0.5;

/// Fraction of each node's outgoing edges flagged as quartile outliers on
/// each tail of the sorted-by-`d_phi` list (§4.6: "lowest and highest
/// 25%").
const QUARTILE_FRACTION: f64 = 0.25;

/// Weighted graph of pairwise rotational differences between frames
/// (§4.6). Every registered correlation inserts a symmetric pair of
/// edges; the graph never stores back-pointers, only `(from, to)` pairs.
#[derive(Debug, Default)]
pub struct AlignmentGraph {
    edges: Vec<AlignmentEdge>,
}

impl AlignmentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> &[AlignmentEdge] {
        &self.edges
    }

    /// Registers a successful or rejected pairwise correlation between
    /// `from` and `to` as a symmetric edge pair (§3).
    pub fn insert_correlation(&mut self, from: FrameId, to: FrameId, result: &CorrelationResult) {
        let (d_phi, d_theta) = result.angular_offset;
        let (dx, dy) = (result.pixel_offset.0 as f64, result.pixel_offset.1 as f64);
        let pair = AlignmentEdge::symmetric_pair(
            from,
            to,
            d_phi,
            d_theta,
            dx,
            dy,
            result.overlap_pixels as f64,
            result.valid,
            result.reject_reason,
        );
        self.edges.extend(pair);
    }

    /// Inserts a synthetic neighbor-filler edge pair for a pair whose
    /// correlation failed but is within graph distance 3 (§4.6, glossary
    /// "Forced edge").
    pub fn insert_forced(&mut self, from: FrameId, to: FrameId) {
        let forward = AlignmentEdge::forced(from, to, FORCED_OVERLAP_WEIGHT);
        let backward = AlignmentEdge::forced(to, from, FORCED_OVERLAP_WEIGHT);
        self.edges.push(forward);
        self.edges.push(backward);
    }

    /// For each node's outgoing, non-forced, valid edges, sorts by
    /// `d_phi` and flags the lowest/highest 25% as quartile outliers
    /// (§4.6: "excluded from the system but kept for reporting").
    pub fn flag_quartile_outliers(&mut self) {
        let mut by_from: HashMap<FrameId, Vec<usize>> = HashMap::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            if edge.valid && !edge.forced {
                by_from.entry(edge.from).or_default().push(idx);
            }
        }
        for indices in by_from.values() {
            let mut sorted = indices.clone();
            sorted.sort_by(|&a, &b| {
                self.edges[a]
                    .d_phi
                    .partial_cmp(&self.edges[b].d_phi)
                    .unwrap()
            });
            let cut = ((sorted.len() as f64) * QUARTILE_FRACTION).floor() as usize;
            for &idx in sorted.iter().take(cut) {
                self.edges[idx].quartile = true;
            }
            for &idx in sorted.iter().rev().take(cut) {
                self.edges[idx].quartile = true;
            }
        }
    }

    /// The distinct frame ids present as either endpoint of any edge.
    pub fn frame_ids(&self) -> Vec<FrameId> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_types::alignment::RejectReason;

    fn ok_result(d_phi: f64) -> CorrelationResult {
        CorrelationResult {
            valid: true,
            pixel_offset: (2, 0),
            angular_offset: (d_phi, 0.0),
            overlap_pixels: 400,
            correlation_variance: 3.0,
            reject_reason: RejectReason::None,
        }
    }

    #[test]
    fn insert_correlation_adds_symmetric_pair() {
        let mut graph = AlignmentGraph::new();
        graph.insert_correlation(1, 2, &ok_result(0.01));
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.edges()[0].d_phi, 0.01);
        assert_eq!(graph.edges()[1].d_phi, -0.01);
    }

    #[test]
    fn quartile_flags_extremes_of_sorted_outgoing_edges() {
        let mut graph = AlignmentGraph::new();
        for (to, d_phi) in [(2, -0.5), (3, -0.01), (4, 0.0), (5, 0.01), (6, 0.5)] {
            graph.insert_correlation(1, to, &ok_result(d_phi));
        }
        graph.flag_quartile_outliers();
        let outgoing: Vec<&AlignmentEdge> = graph.edges().iter().filter(|e| e.from == 1).collect();
        assert!(outgoing.iter().find(|e| e.to == 2).unwrap().quartile);
        assert!(outgoing.iter().find(|e| e.to == 6).unwrap().quartile);
        assert!(!outgoing.iter().find(|e| e.to == 4).unwrap().quartile);
    }

    #[test]
    fn forced_edges_excluded_from_quartile_flagging() {
        let mut graph = AlignmentGraph::new();
        graph.insert_forced(1, 2);
        graph.flag_quartile_outliers();
        assert!(!graph.edges()[0].quartile);
    }
}
