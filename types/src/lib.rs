//! Shared data model for the spherical panorama recorder/stitcher (§3).
//!
//! This crate has no algorithmic logic of its own — it is the common
//! vocabulary every other `panorama-*` crate builds on.

pub mod alignment;
pub mod checkpoint;
pub mod colorspace;
pub mod error;
pub mod exposure;
pub mod exposure_edge;
pub mod frame;
pub mod graph;
pub mod intrinsics;
pub mod mode;
pub mod platform;
pub mod pose;
pub mod selection;
pub mod stitched_ring;

pub use alignment::{AlignmentEdge, RejectReason};
pub use colorspace::Colorspace;
pub use error::{StitchError, StitchResult};
pub use exposure::Exposure;
pub use exposure_edge::ExposureEdge;
pub use frame::{Frame, FrameId, PixelLoader};
pub use graph::{RecorderGraph, Ring, SelectionEdge, SelectionPoint};
pub use intrinsics::Intrinsics;
pub use mode::RecorderMode;
pub use platform::Platform;
pub use pose::{Pose, Rotation3};
pub use selection::SelectionInfo;
pub use stitched_ring::StitchedRing;
