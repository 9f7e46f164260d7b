use std::collections::HashMap;

use image::imageops::FilterType;

use panorama_align::{apply as apply_alignment, solve_graph, AlignmentGraph};
use panorama_correlate::buffer::ColorBuffer;
use panorama_correlate::overlap::extract_overlap;
use panorama_math::intrinsics_scale::scale_to_size;
use panorama_recorder::close_ring;
use panorama_types::error::StitchResult;
use panorama_types::exposure_edge::ExposureEdge;
use panorama_types::frame::{Frame, FrameId};
use panorama_types::graph::SelectionPoint;
use panorama_types::selection::SelectionInfo;

use crate::exposure::{solve_exposure, ExposureGraph};
use crate::focal_refine::refine_focal_length;
use crate::offsets::{cross_produce_offsets, OffsetMap};

/// Within-ring and adjacent-ring graph distance under which a pair is
/// worth correlating at all (§4.6: "graph distance ≤3").
const NEIGHBOR_DISTANCE: u32 = 3;

/// Width mini copies are downsampled to for matching, leaving the
/// original full-resolution frame untouched for later stitching (§5
/// resource policy: "3-level downsampled copies for matching" — one
/// `/8` step stands in for three halvings).
const MINI_WIDTH_DIVISOR: u32 = 8;

/// Tolerance used to assign a finished frame to its nearest ring (§4.7
/// finalize step 1: "nearest-point lookup with tolerance π/8").
const RING_ASSIGNMENT_TOLERANCE: f64 = std::f64::consts::FRAC_PI_8;

struct StoredFrame {
    frame: Frame,
    point: SelectionPoint,
    mini: Frame,
}

/// Output of [`CorrespondenceFinder::finalize`] (§4.7: "Emit: adjusted
/// frame list, alignment map, gains map, offset map").
pub struct FinalizeResult {
    pub frames: Vec<Frame>,
    pub rings: Vec<Vec<FrameId>>,
    pub alignment: AlignmentGraph,
    pub gains: HashMap<FrameId, f64>,
    pub offsets: OffsetMap,
}

/// Orchestrates the pipeline and finalize phases of §4.7: incrementally
/// builds the alignment/exposure graphs as frames are pushed, then runs
/// ring splitting, ring closure, the global solves, optional focal
/// refinement, and offset cross-production at `finish()`.
pub struct CorrespondenceFinder {
    stored: Vec<StoredFrame>,
    alignment: AlignmentGraph,
    exposure: ExposureGraph,
    margin: f64,
    close_rings: bool,
    refine_focal: bool,
}

impl CorrespondenceFinder {
    pub fn new(margin: f64, close_rings: bool, refine_focal: bool) -> Self {
        Self {
            stored: Vec::new(),
            alignment: AlignmentGraph::new(),
            exposure: ExposureGraph::new(),
            margin,
            close_rings,
            refine_focal,
        }
    }

    /// Pipeline phase (§4.7): stores the accepted frame plus a downsampled
    /// mini copy, then correlates it against every previously stored
    /// neighbor.
    pub fn push(&mut self, info: &SelectionInfo) -> StitchResult<()> {
        let mini = make_mini(&info.frame)?;

        for existing in &self.stored {
            if !is_neighbor(&existing.point, &info.point) {
                continue;
            }
            let result = panorama_correlate::correlate(&existing.mini, &mini, self.margin)?;
            self.alignment.insert_correlation(existing.frame.id, info.frame.id, &result);
            if result.valid {
                if let Some(edge) = exposure_edge(&existing.mini, &mini, existing.frame.id, info.frame.id, self.margin)? {
                    self.exposure.insert(edge);
                }
            } else {
                self.alignment.insert_forced(existing.frame.id, info.frame.id);
            }
        }

        self.stored.push(StoredFrame {
            frame: info.frame.clone(),
            point: info.point,
            mini,
        });
        Ok(())
    }

    /// Finalize phase (§4.7 steps 1-6).
    pub fn finalize(mut self) -> StitchResult<FinalizeResult> {
        let rings = split_into_rings(&self.stored);

        if self.close_rings {
            for ring in &rings {
                let frames: Vec<Frame> = ring.iter().filter_map(|&id| self.find_frame(id)).collect();
                close_ring(&frames, self.margin)?;
            }
        }

        self.alignment.flag_quartile_outliers();
        let solution = solve_graph(&self.alignment);
        let mut frames: Vec<Frame> = self.stored.iter().map(|s| s.frame.clone()).collect();
        apply_alignment(&mut frames, &solution);

        let gains_solution = solve_exposure(&self.exposure);
        let gains: HashMap<FrameId, f64> = frames.iter().map(|f| (f.id, gains_solution.get(f.id))).collect();

        if self.refine_focal {
            refine_focal_length(&rings, self.alignment.edges(), &mut frames);
        }

        let mut direct_offsets = HashMap::new();
        for edge in self.alignment.edges() {
            if edge.valid && !edge.forced {
                direct_offsets.insert((edge.from, edge.to), (edge.dx, edge.dy));
            }
        }
        let offsets = cross_produce_offsets(&direct_offsets);

        Ok(FinalizeResult {
            frames,
            rings,
            alignment: self.alignment,
            gains,
            offsets,
        })
    }

    fn find_frame(&self, id: FrameId) -> Option<Frame> {
        self.stored.iter().find(|s| s.frame.id == id).map(|s| s.frame.clone())
    }
}

/// Assigns every stored frame to the ring of its nearest selection point,
/// within [`RING_ASSIGNMENT_TOLERANCE`], preserving push order within each
/// ring (§4.7 finalize step 1).
fn split_into_rings(stored: &[StoredFrame]) -> Vec<Vec<FrameId>> {
    let mut by_ring: HashMap<u32, Vec<FrameId>> = HashMap::new();
    for entry in stored {
        let rotation = panorama_math::rotation::rotation_of(&entry.frame.adjusted_pose());
        let distance = panorama_math::rotation::angle_between(&rotation, &entry.point.extrinsics);
        if distance <= RING_ASSIGNMENT_TOLERANCE {
            by_ring.entry(entry.point.ring_id).or_default().push(entry.frame.id);
        }
    }
    let mut ring_ids: Vec<u32> = by_ring.keys().copied().collect();
    ring_ids.sort_unstable();
    ring_ids.into_iter().map(|id| by_ring.remove(&id).unwrap()).collect()
}

/// In-ring neighbors within [`NEIGHBOR_DISTANCE`] local-id steps
/// (wraparound), or adjacent-ring neighbors whose fractional position
/// around the ring is within the same angular budget (§4.6, §4.7).
fn is_neighbor(a: &SelectionPoint, b: &SelectionPoint) -> bool {
    if a.global_id == b.global_id {
        return false;
    }
    if a.ring_id == b.ring_id {
        return ring_distance(a.local_id, b.local_id, a.ring_size) <= NEIGHBOR_DISTANCE;
    }
    if a.ring_id.abs_diff(b.ring_id) == 1 {
        let frac_a = a.local_id as f64 / a.ring_size.max(1) as f64;
        let frac_b = b.local_id as f64 / b.ring_size.max(1) as f64;
        let raw = (frac_a - frac_b).abs();
        let frac_dist = raw.min(1.0 - raw);
        let bigger = a.ring_size.max(b.ring_size) as f64;
        return frac_dist * bigger <= NEIGHBOR_DISTANCE as f64;
    }
    false
}

fn ring_distance(a: u32, b: u32, size: u32) -> u32 {
    let diff = a.abs_diff(b);
    diff.min(size.saturating_sub(diff))
}

/// Downsamples a frame's image and rescales its intrinsics to
/// `width/MINI_WIDTH_DIVISOR`, leaving the original frame (and its pose
/// storage) untouched (§5 resource policy).
fn make_mini(frame: &Frame) -> StitchResult<Frame> {
    let intrinsics = frame.intrinsics();
    let target_width = (intrinsics.width / MINI_WIDTH_DIVISOR).max(8);
    if intrinsics.width <= target_width {
        return Ok(frame.clone());
    }
    let target_height = ((intrinsics.height as f64 * target_width as f64 / intrinsics.width as f64).round().max(8.0)) as u32;
    let mini_intrinsics = scale_to_size(&intrinsics, target_width, target_height);
    let image = frame.with_pixels(|img| image::imageops::resize(img, target_width, target_height, FilterType::Triangle))?;
    Ok(Frame::from_loaded(image, frame.adjusted_pose(), mini_intrinsics, frame.exposure))
}

/// Mean-intensity comparison over the pair's overlap region, feeding the
/// exposure solve (§4.7 step 4, §3).
fn exposure_edge(a: &Frame, b: &Frame, from: FrameId, to: FrameId, margin: f64) -> StitchResult<Option<ExposureEdge>> {
    let overlap = match extract_overlap(a, b, margin)? {
        Some(overlap) => overlap,
        None => return Ok(None),
    };
    Ok(Some(ExposureEdge {
        from,
        to,
        overlap_pixels: overlap.a.width * overlap.a.height,
        mean_intensity_from: mean_intensity(&overlap.a),
        mean_intensity_to: mean_intensity(&overlap.b),
    }))
}

fn mean_intensity(buf: &ColorBuffer) -> f64 {
    let mut sum = 0.0;
    let mut count = 0.0;
    for y in 0..buf.height as i64 {
        for x in 0..buf.width as i64 {
            if let Some([r, g, b]) = buf.get(x, y) {
                sum += 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
                count += 1.0;
            }
        }
    }
    if count > 0.0 {
        sum / count
    } else {
        0.0
    }
}
