//! Checkpoint persistence, debug sinks, and the image-codec boundary
//! (§6). Kept separate from `panorama-pipeline` so the orchestration
//! crate can depend on a trait object instead of a filesystem layout.

pub mod checkpoint;
pub mod codec;
pub mod debug_sink;

pub use checkpoint::{CheckpointStore, FsCheckpointStore, NullCheckpointStore};
pub use codec::{ImageCodec, LibraryCodec};
pub use debug_sink::{DebugSink, FsDebugSink, NullDebugSink};
