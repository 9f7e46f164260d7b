use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use panorama_io::{CheckpointStore, DebugSink};
use panorama_recorder::{Selector, Tolerance};
use panorama_types::checkpoint::FrameRecord;
use panorama_types::error::StitchResult;
use panorama_types::frame::Frame;
use panorama_types::graph::RecorderGraph;
use panorama_types::pose::Pose;
use panorama_types::selection::SelectionInfo;
use task_manager::{Task, TaskManager, TaskState};

use crate::correspondence::{CorrespondenceFinder, FinalizeResult};

/// Default bounded capacity of the correspondence-finder inbox (§5
/// [AMBIENT]: "taken from configuration... not hardcoded").
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

fn pose_to_array16(pose: Pose) -> [f64; 16] {
    let mut out = [0.0; 16];
    for r in 0..4 {
        for c in 0..4 {
            out[r * 4 + c] = pose[(r, c)];
        }
    }
    out
}

/// Drains the correspondence-finder queue one selection match at a time,
/// feeding the orchestrator and checkpointing the frame record (§5
/// "asynchronous queue feeding the correspondence finder / storage
/// sink").
struct FinderDrain {
    rx: Mutex<mpsc::Receiver<SelectionInfo>>,
    finder: Arc<Mutex<CorrespondenceFinder>>,
    checkpoint: Arc<dyn CheckpointStore>,
}

#[async_trait::async_trait]
impl Task for FinderDrain {
    fn task_name(&self) -> String {
        "correspondence-finder".to_string()
    }

    async fn run(&self) -> TaskState {
        let received = self.rx.lock().await.recv().await;
        let Some(info) = received else {
            return TaskState::Break;
        };

        {
            let mut finder = self.finder.lock().await;
            if let Err(err) = finder.push(&info) {
                tracing::error!(?err, frame_id = info.frame.id, "correspondence finder rejected a pushed frame");
            }
        }

        let intrinsics = info.frame.intrinsics();
        let record = FrameRecord {
            id: info.frame.id,
            width: intrinsics.width,
            height: intrinsics.height,
            intrinsics: intrinsics.to_array9(),
            adjusted_extrinsics: pose_to_array16(info.frame.adjusted_pose()),
            original_extrinsics: pose_to_array16(info.frame.original_pose),
        };
        if let Err(err) = self.checkpoint.write_frame_record(info.frame.id, &record) {
            tracing::warn!(?err, frame_id = info.frame.id, "failed to checkpoint frame record");
        }
        TaskState::Continue
    }
}

/// Owns the recorder's lifetime task manager, the producer-side selector,
/// and the asynchronous correspondence-finder queue (§5). `Recorder` is
/// the external surface described in §6: `push`/`finish`, plus
/// `cancel()`.
pub struct Recorder {
    task_manager: TaskManager,
    selector: Mutex<Selector>,
    tx: mpsc::Sender<SelectionInfo>,
    finder: Arc<Mutex<CorrespondenceFinder>>,
    finished: Arc<AtomicBool>,
    debug_sink: Arc<dyn DebugSink>,
}

impl Recorder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: RecorderGraph,
        strict_order: bool,
        tolerance: Tolerance,
        checkpoint: Arc<dyn CheckpointStore>,
        debug_sink: Arc<dyn DebugSink>,
        margin: f64,
        close_rings: bool,
        refine_focal: bool,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let finder = Arc::new(Mutex::new(CorrespondenceFinder::new(margin, close_rings, refine_focal)));
        let task_manager = TaskManager::new();
        task_manager.spawn_task(FinderDrain {
            rx: Mutex::new(rx),
            finder: finder.clone(),
            checkpoint,
        });
        Self {
            task_manager,
            selector: Mutex::new(Selector::new(graph, strict_order, tolerance)),
            tx,
            finder,
            finished: Arc::new(AtomicBool::new(false)),
            debug_sink,
        }
    }

    /// Runs the selector on the producer side (§5 "The selector runs on
    /// the producer task"); if it emits a match, forwards it to the
    /// correspondence-finder queue (backpressure on `send`) and to the
    /// debug sink.
    pub async fn push(&self, frame: &Frame) -> StitchResult<()> {
        if self.finished.load(Ordering::Acquire) {
            return Ok(());
        }
        let emitted = {
            let mut selector = self.selector.lock().await;
            selector.push(frame)
        };
        let Some(info) = emitted else {
            return Ok(());
        };

        if let Ok(image) = info.frame.with_pixels(|image| image.clone()) {
            if let Err(err) = self.debug_sink.record_accepted_frame(info.frame.id, &image) {
                tracing::warn!(?err, frame_id = info.frame.id, "debug sink write failed");
            }
        }

        let _ = self.tx.send(info).await;
        Ok(())
    }

    /// Poisons the producer path; in-flight work already queued still
    /// drains (§5 "Cancellation").
    pub fn cancel(&self) {
        self.finished.store(true, Ordering::Release);
        self.task_manager.cancel_all();
    }

    /// Closes the producer side, drains the correspondence-finder queue,
    /// and runs the finalize phase (§4.7, §5: "`finish()` still returns
    /// valid (possibly empty) partial outputs and is idempotent").
    pub async fn finish(self) -> StitchResult<FinalizeResult> {
        self.finished.store(true, Ordering::Release);
        drop(self.tx);
        self.task_manager.wait().await;
        let finder = Arc::try_unwrap(self.finder).unwrap_or_else(|still_shared| {
            tracing::warn!(
                outstanding = Arc::strong_count(&still_shared),
                "finder still has outstanding references at finish(); finalizing a clone is not possible, panicking"
            );
            panic!("correspondence finder still shared at finish()")
        });
        finder.into_inner().finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_io::NullCheckpointStore;
    use panorama_io::NullDebugSink;
    use panorama_math::rotation::to_4x4;
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;
    use panorama_types::mode::RecorderMode;

    fn tolerant() -> Tolerance {
        Tolerance { x: 0.3, y: 0.3, z: 0.3 }
    }

    fn frame_at_rotation(r: panorama_types::pose::Rotation3) -> Frame {
        Frame::from_loaded(
            image::RgbImage::new(4, 4),
            to_4x4(r),
            Intrinsics::new(800.0, 800.0, 2.0, 2.0, 4, 4),
            Exposure::default(),
        )
    }

    #[tokio::test]
    async fn advancing_past_a_point_emits_it_into_the_finalized_frames() {
        let graph = panorama_recorder::generate(&Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960), RecorderMode::CenterOnly);
        let ring = graph.rings[0].clone();
        let point0 = ring.points[0];
        let point1 = *ring.successor(0).unwrap();
        let recorder = Recorder::new(
            graph,
            true,
            tolerant(),
            Arc::new(NullCheckpointStore),
            Arc::new(NullDebugSink),
            8.0,
            false,
            false,
            DEFAULT_QUEUE_CAPACITY,
        );
        recorder.push(&frame_at_rotation(point0.extrinsics)).await.unwrap();
        recorder.push(&frame_at_rotation(point1.extrinsics)).await.unwrap();
        let result = recorder.finish().await.unwrap();
        assert_eq!(result.frames.len(), 1);
    }

    #[tokio::test]
    async fn cancel_then_finish_is_idempotent_and_does_not_panic() {
        let graph = panorama_recorder::generate(&Intrinsics::new(800.0, 800.0, 640.0, 480.0, 1280, 960), RecorderMode::CenterOnly);
        let recorder = Recorder::new(
            graph,
            true,
            tolerant(),
            Arc::new(NullCheckpointStore),
            Arc::new(NullDebugSink),
            8.0,
            false,
            false,
            DEFAULT_QUEUE_CAPACITY,
        );
        recorder.cancel();
        let result = recorder.finish().await.unwrap();
        assert!(result.frames.is_empty());
    }
}
