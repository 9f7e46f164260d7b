use serde::{Deserialize, Serialize};

use crate::pose::Rotation3;

/// A predefined target viewpoint on the sphere (§3 "selection point").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub global_id: u32,
    pub local_id: u32,
    pub ring_id: u32,
    pub ring_size: u32,
    pub h_center: f64,
    pub v_center: f64,
    pub h_fov: f64,
    pub v_fov: f64,
    #[serde(with = "rotation3_serde")]
    pub extrinsics: Rotation3,
}

/// A directed successor edge within one ring (§3: "each point has exactly
/// one outgoing edge to its successor in the ring, wrapping").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionEdge {
    pub from: u32,
    pub to: u32,
    pub recorded: bool,
}

/// One latitude circle of selection points plus their successor cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id: u32,
    pub points: Vec<SelectionPoint>,
    pub edges: Vec<SelectionEdge>,
}

impl Ring {
    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn point_at(&self, local_id: u32) -> Option<&SelectionPoint> {
        self.points.iter().find(|p| p.local_id == local_id)
    }

    /// Successor of the point at `local_id`, following the ring's
    /// directed cycle (wrapping).
    pub fn successor(&self, local_id: u32) -> Option<&SelectionPoint> {
        let edge = self.edges.iter().find(|e| e.from == local_id)?;
        self.points.iter().find(|p| p.local_id == edge.to)
    }

    pub fn mark_recorded(&mut self, from: u32, to: u32) {
        if let Some(edge) = self
            .edges
            .iter_mut()
            .find(|e| e.from == from && e.to == to)
        {
            edge.recorded = true;
        }
    }
}

/// The full set of selection points plus successor edges (§3 "recorder
/// graph"), indexed ring-major with the center ring at the middle index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderGraph {
    pub rings: Vec<Ring>,
}

impl RecorderGraph {
    pub fn center_ring_index(&self) -> usize {
        self.rings.len() / 2
    }

    pub fn total_points(&self) -> usize {
        self.rings.iter().map(Ring::size).sum()
    }

    pub fn point_by_global_id(&self, global_id: u32) -> Option<&SelectionPoint> {
        self.rings
            .iter()
            .flat_map(|r| r.points.iter())
            .find(|p| p.global_id == global_id)
    }

    /// Order in which rings are visited: center outward, top of a pair
    /// before its bottom (§4.4 step 5).
    pub fn ring_visit_order(&self) -> Vec<usize> {
        let center = self.center_ring_index();
        let mut order = vec![center];
        let mut top = center;
        let mut bottom = center;
        loop {
            let moved_top = top > 0;
            let moved_bottom = bottom + 1 < self.rings.len();
            if !moved_top && !moved_bottom {
                break;
            }
            if moved_top {
                top -= 1;
                order.push(top);
            }
            if moved_bottom {
                bottom += 1;
                order.push(bottom);
            }
        }
        order
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen_global = std::collections::HashSet::new();
        for (idx, ring) in self.rings.iter().enumerate() {
            if ring.points.is_empty() {
                return Err(format!("ring {idx} has zero points"));
            }
            let mut local_ids: Vec<u32> = ring.points.iter().map(|p| p.local_id).collect();
            local_ids.sort_unstable();
            let expected: Vec<u32> = (0..ring.points.len() as u32).collect();
            if local_ids != expected {
                return Err(format!("ring {idx} local ids not contiguous 0..size"));
            }
            if ring.edges.len() != ring.points.len() {
                return Err(format!("ring {idx} edge count does not match point count"));
            }
            // Edges must form a single directed cycle covering every point.
            let mut visited = vec![false; ring.points.len()];
            let mut cur = 0u32;
            for _ in 0..ring.points.len() {
                if visited[cur as usize] {
                    return Err(format!("ring {idx} edges do not form a single cycle"));
                }
                visited[cur as usize] = true;
                cur = ring
                    .successor(cur)
                    .ok_or_else(|| format!("ring {idx} missing successor edge"))?
                    .local_id;
            }
            if cur != 0 {
                return Err(format!("ring {idx} cycle does not close"));
            }
            for p in &ring.points {
                if !seen_global.insert(p.global_id) {
                    return Err(format!("global id {} duplicated", p.global_id));
                }
            }
        }
        let mut all_ids: Vec<u32> = seen_global.into_iter().collect();
        all_ids.sort_unstable();
        let expected: Vec<u32> = (0..self.total_points() as u32).collect();
        if all_ids != expected {
            return Err("global ids are not a contiguous 0..N numbering".to_string());
        }
        Ok(())
    }
}

mod rotation3_serde {
    use crate::pose::Rotation3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &Rotation3, s: S) -> Result<S::Ok, S::Error> {
        let arr: [f64; 9] = [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ];
        arr.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Rotation3, D::Error> {
        let a = <[f64; 9]>::deserialize(d)?;
        Ok(Rotation3::new(
            a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7], a[8],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(global_id: u32, local_id: u32, ring_id: u32, ring_size: u32) -> SelectionPoint {
        SelectionPoint {
            global_id,
            local_id,
            ring_id,
            ring_size,
            h_center: 0.0,
            v_center: 0.0,
            h_fov: 0.1,
            v_fov: 0.1,
            extrinsics: Rotation3::identity(),
        }
    }

    fn simple_ring(ring_id: u32, size: u32, base: u32) -> Ring {
        let points = (0..size)
            .map(|i| point(base + i, i, ring_id, size))
            .collect();
        let edges = (0..size)
            .map(|i| SelectionEdge {
                from: i,
                to: (i + 1) % size,
                recorded: false,
            })
            .collect();
        Ring {
            ring_id,
            points,
            edges,
        }
    }

    #[test]
    fn validates_single_ring_cycle() {
        let graph = RecorderGraph {
            rings: vec![simple_ring(0, 4, 0)],
        };
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn rejects_broken_cycle() {
        let mut ring = simple_ring(0, 4, 0);
        ring.edges[1].to = 1; // self loop breaks the cycle
        let graph = RecorderGraph { rings: vec![ring] };
        assert!(graph.validate().is_err());
    }

    #[test]
    fn visit_order_is_center_outward_top_before_bottom() {
        let graph = RecorderGraph {
            rings: vec![
                simple_ring(0, 3, 0),
                simple_ring(1, 3, 3),
                simple_ring(2, 3, 6), // center
                simple_ring(3, 3, 9),
                simple_ring(4, 3, 12),
            ],
        };
        assert_eq!(graph.ring_visit_order(), vec![2, 1, 3, 0, 4]);
    }
}
