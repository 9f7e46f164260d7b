use std::collections::HashMap;

use panorama_types::frame::FrameId;

/// Translational pixel-offset hint between two frames, keyed symmetrically
/// (§4.7 step 6: "every frame pair that could be stitched has a
/// translational hint available").
#[derive(Debug, Default)]
pub struct OffsetMap {
    offsets: HashMap<(FrameId, FrameId), (f64, f64)>,
}

impl OffsetMap {
    pub fn get(&self, a: FrameId, b: FrameId) -> Option<(f64, f64)> {
        self.offsets.get(&(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Takes the directly-measured offsets from the correspondence finder and
/// closes the transitive set: if `a→b` and `b→c` are both known and
/// `a→c` is not, it is filled in as their sum. Runs to a fixed point
/// (bounded by the number of distinct frames) rather than a single pass,
/// since a fresh composition can itself enable another.
pub fn cross_produce_offsets(direct: &HashMap<(FrameId, FrameId), (f64, f64)>) -> OffsetMap {
    let mut offsets = direct.clone();
    let ids: Vec<FrameId> = {
        let mut ids: Vec<FrameId> = offsets.keys().flat_map(|&(a, b)| [a, b]).collect::<std::collections::HashSet<_>>().into_iter().collect();
        ids.sort_unstable();
        ids
    };

    for _ in 0..ids.len() {
        let mut additions = Vec::new();
        for &k in &ids {
            for &i in &ids {
                let Some(&(ix, iy)) = offsets.get(&(i, k)) else { continue };
                for &j in &ids {
                    if offsets.contains_key(&(i, j)) || i == j {
                        continue;
                    }
                    if let Some(&(kx, ky)) = offsets.get(&(k, j)) {
                        additions.push(((i, j), (ix + kx, iy + ky)));
                    }
                }
            }
        }
        if additions.is_empty() {
            break;
        }
        for (key, value) in additions {
            offsets.entry(key).or_insert(value);
        }
    }

    OffsetMap { offsets }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_transitive_offset_through_a_shared_neighbor() {
        let mut direct = HashMap::new();
        direct.insert((1, 2), (10.0, 0.0));
        direct.insert((2, 3), (5.0, 1.0));
        let closed = cross_produce_offsets(&direct);
        assert_eq!(closed.get(1, 3), Some((15.0, 1.0)));
    }

    #[test]
    fn leaves_direct_offsets_untouched() {
        let mut direct = HashMap::new();
        direct.insert((1, 2), (3.0, 4.0));
        let closed = cross_produce_offsets(&direct);
        assert_eq!(closed.get(1, 2), Some((3.0, 4.0)));
    }
}
