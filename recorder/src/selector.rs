use nalgebra::Vector3;

use panorama_math::rotation::{angle_between, rotation_of, rotation_vector};
use panorama_math::slerp::slerp;
use panorama_types::frame::Frame;
use panorama_types::graph::{RecorderGraph, SelectionPoint};
use panorama_types::pose::{Pose, Rotation3};
use panorama_types::selection::SelectionInfo;

/// How many successor hops ahead of the current target the guidance ball
/// is shown (§4.4 glossary: "typically two successors ahead").
pub const BALL_LEAD: u32 = 2;

/// Per-axis rotation tolerance gate (§4.4 step 2).
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Tolerance {
    /// The Z tolerance is widened 1.5x on non-center rings (§4.4 step 2).
    fn for_ring(&self, is_center_ring: bool) -> Tolerance {
        Tolerance {
            x: self.x,
            y: self.y,
            z: if is_center_ring { self.z } else { self.z * 1.5 },
        }
    }
}

/// The feedback image selector: a state machine mapping a stream of
/// oriented frames onto recorder graph nodes, one frame per node, in
/// prescribed order (§4.4).
pub struct Selector {
    graph: RecorderGraph,
    visit_order: Vec<usize>,
    visit_pos: usize,
    strict_order: bool,
    tolerance: Tolerance,
    current_best: Option<SelectionInfo>,
    finished: bool,
    idle: bool,
    started: bool,
    recorded_count: u32,
    ball_position: Rotation3,
    error_vector: Vector3<f64>,
}

impl Selector {
    pub fn new(graph: RecorderGraph, strict_order: bool, tolerance: Tolerance) -> Self {
        let visit_order = graph.ring_visit_order();
        Selector {
            graph,
            visit_order,
            visit_pos: 0,
            strict_order,
            tolerance,
            current_best: None,
            finished: false,
            idle: false,
            started: false,
            recorded_count: 0,
            ball_position: Rotation3::identity(),
            error_vector: Vector3::zeros(),
        }
    }

    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn current_keyframe(&self) -> Option<&SelectionInfo> {
        self.current_best.as_ref()
    }

    pub fn images_to_record(&self) -> usize {
        self.graph.total_points()
    }

    pub fn recorded_images(&self) -> u32 {
        self.recorded_count
    }

    pub fn ball_position(&self) -> Rotation3 {
        self.ball_position
    }

    pub fn error_vector(&self) -> Vector3<f64> {
        self.error_vector
    }

    pub fn scalar_error(&self) -> f64 {
        self.error_vector.norm()
    }

    pub fn graph(&self) -> &RecorderGraph {
        &self.graph
    }

    /// Processes one incoming frame, returning the completed match (if
    /// any) emitted by this push (§4.4 "Per-frame procedure").
    pub fn push(&mut self, frame: &Frame) -> Option<SelectionInfo> {
        if self.finished {
            return None;
        }
        let frame_rotation = rotation_of(&frame.adjusted_pose());
        self.update_guidance(&frame_rotation);

        if self.idle {
            return None;
        }
        self.started = true;

        let ring_idx = self.visit_order[self.visit_pos];
        let is_center = ring_idx == self.graph.center_ring_index();
        let candidate = self.closest_point(ring_idx, &frame_rotation);
        if !self.passes_tolerance(&candidate, &frame_rotation, is_center) {
            return None;
        }

        let emitted = match &self.current_best {
            None => {
                self.current_best = Some(self.make_info(candidate, frame, &frame_rotation));
                None
            }
            Some(cur) if cur.point.global_id == candidate.global_id => {
                let dist = angle_between(&frame_rotation, &candidate.extrinsics);
                if dist < cur.angular_distance {
                    self.current_best = Some(self.make_info(candidate, frame, &frame_rotation));
                }
                None
            }
            Some(cur) => self.handle_new_point(ring_idx, cur.point, candidate, frame, &frame_rotation, is_center),
        };

        emitted
    }

    fn handle_new_point(
        &mut self,
        ring_idx: usize,
        current_point: SelectionPoint,
        candidate: SelectionPoint,
        frame: &Frame,
        frame_rotation: &Rotation3,
        is_center: bool,
    ) -> Option<SelectionInfo> {
        let ring = &self.graph.rings[ring_idx];
        let successor = ring.successor(current_point.local_id).copied();

        let mut target = candidate;
        if self.strict_order {
            if let Some(succ) = successor {
                if succ.global_id != candidate.global_id {
                    if self.passes_tolerance(&succ, frame_rotation, is_center) {
                        target = succ; // substitution (§4.4 step 5)
                    } else {
                        return None;
                    }
                }
            }
        }

        let succ = successor?;
        if succ.global_id != target.global_id {
            return None;
        }

        let ring = &mut self.graph.rings[ring_idx];
        ring.mark_recorded(current_point.local_id, succ.local_id);
        self.recorded_count += 1;
        let emitted = self.current_best.take();

        if succ.local_id == 0 {
            // The ring-closing edge just recorded; move on to the next
            // ring in visit order (§4.4 step 5).
            self.current_best = None;
            self.visit_pos += 1;
            if self.visit_pos >= self.visit_order.len() {
                self.finished = true;
            }
        } else {
            self.current_best = Some(self.make_info(succ, frame, frame_rotation));
        }

        emitted
    }

    fn make_info(&self, point: SelectionPoint, frame: &Frame, frame_rotation: &Rotation3) -> SelectionInfo {
        SelectionInfo {
            point,
            frame: frame.clone(),
            angular_distance: angle_between(frame_rotation, &point.extrinsics),
            valid: true,
        }
    }

    fn closest_point(&self, ring_idx: usize, frame_rotation: &Rotation3) -> SelectionPoint {
        let ring = &self.graph.rings[ring_idx];
        *ring
            .points
            .iter()
            .min_by(|a, b| {
                angle_between(frame_rotation, &a.extrinsics)
                    .partial_cmp(&angle_between(frame_rotation, &b.extrinsics))
                    .unwrap()
            })
            .expect("ring has at least one point")
    }

    fn passes_tolerance(&self, point: &SelectionPoint, frame_rotation: &Rotation3, is_center: bool) -> bool {
        let tolerance = self.tolerance.for_ring(is_center);
        let error = rotation_vector(&point.extrinsics, frame_rotation);
        error.x.abs() <= tolerance.x && error.y.abs() <= tolerance.y && error.z.abs() <= tolerance.z
    }

    fn update_guidance(&mut self, frame_rotation: &Rotation3) {
        let target = self.ball_target();
        let blended = slerp(&pose_of(self.ball_position), &pose_of(target.extrinsics), 0.5);
        self.ball_position = rotation_of(&blended);
        self.error_vector = rotation_vector(frame_rotation, &self.ball_position);
    }

    /// Walks `BALL_LEAD` successors ahead of the current target, crossing
    /// into the next ring of the visit order when a ring's closing edge is
    /// reached (§4.4 step 6).
    fn ball_target(&self) -> SelectionPoint {
        if self.visit_pos >= self.visit_order.len() {
            // Finished: keep showing the last ring's starting point.
            let ring_idx = *self.visit_order.last().unwrap_or(&0);
            return self.graph.rings[ring_idx].points[0];
        }
        let mut ring_pos = self.visit_pos;
        let mut ring_idx = self.visit_order[ring_pos];
        let mut point = match &self.current_best {
            Some(cur) => cur.point,
            None => self.graph.rings[ring_idx].points[0],
        };

        for _ in 0..BALL_LEAD {
            let ring = &self.graph.rings[ring_idx];
            let succ = match ring.successor(point.local_id) {
                Some(s) => *s,
                None => break,
            };
            if succ.local_id == 0 {
                if ring_pos + 1 < self.visit_order.len() {
                    ring_pos += 1;
                    ring_idx = self.visit_order[ring_pos];
                    point = self.graph.rings[ring_idx].points[0];
                } else {
                    point = succ;
                    break;
                }
            } else {
                point = succ;
            }
        }
        point
    }
}

fn pose_of(r: Rotation3) -> Pose {
    panorama_math::rotation::to_4x4(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_math::rotation::to_4x4;
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;
    use panorama_types::mode::RecorderMode;

    fn tolerant() -> Tolerance {
        Tolerance { x: 0.2, y: 0.2, z: 0.2 }
    }

    fn frame_at(r: Rotation3) -> Frame {
        let image = image::RgbImage::new(4, 4);
        Frame::from_loaded(
            image,
            to_4x4(r),
            Intrinsics::new(800.0, 800.0, 2.0, 2.0, 4, 4),
            Exposure::default(),
        )
    }

    #[test]
    fn first_frame_becomes_current_with_no_emission() {
        let graph = crate::generator::generate(
            &Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960),
            RecorderMode::CenterOnly,
        );
        let point0 = graph.rings[0].points[0];
        let mut selector = Selector::new(graph, true, tolerant());
        let emitted = selector.push(&frame_at(point0.extrinsics));
        assert!(emitted.is_none());
        assert!(selector.current_keyframe().is_some());
    }

    #[test]
    fn advancing_to_successor_emits_previous_match() {
        let graph = crate::generator::generate(
            &Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960),
            RecorderMode::CenterOnly,
        );
        let ring = graph.rings[0].clone();
        let point0 = ring.points[0];
        let point1 = *ring.successor(0).unwrap();
        let mut selector = Selector::new(graph, true, tolerant());
        assert!(selector.push(&frame_at(point0.extrinsics)).is_none());
        let emitted = selector.push(&frame_at(point1.extrinsics));
        assert!(emitted.is_some());
        assert_eq!(emitted.unwrap().point.global_id, point0.global_id);
    }

    #[test]
    fn idle_suppresses_advancement() {
        let graph = crate::generator::generate(
            &Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960),
            RecorderMode::CenterOnly,
        );
        let point0 = graph.rings[0].points[0];
        let mut selector = Selector::new(graph, true, tolerant());
        selector.set_idle(true);
        assert!(selector.push(&frame_at(point0.extrinsics)).is_none());
        assert!(selector.current_keyframe().is_none());
    }
}
