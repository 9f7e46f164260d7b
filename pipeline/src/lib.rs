//! Orchestrates the pipeline and finalize phases of the image
//! correspondence finder, the coordinate-converter stage that normalizes
//! platform-specific sensor poses before they reach the recorder graph,
//! and the concurrency model (task manager, bounded channel, selector)
//! that wires the recorder's producer/consumer tasks together.

pub mod coordinate_converter;
pub mod correspondence;
pub mod exposure;
pub mod focal_refine;
pub mod offsets;
pub mod recorder_task;
pub mod stereo_batch;

pub use coordinate_converter::CoordinateConverter;
pub use correspondence::{CorrespondenceFinder, FinalizeResult};
pub use exposure::{solve_exposure, ExposureGraph, ExposureSolution};
pub use focal_refine::refine_focal_length;
pub use offsets::{cross_produce_offsets, OffsetMap};
pub use recorder_task::{Recorder, DEFAULT_QUEUE_CAPACITY};
pub use stereo_batch::StereoBatch;
