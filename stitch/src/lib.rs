//! Spherical warping, single-ring stitching (§4.10), and multi-ring
//! composition (§4.11).

pub mod multiring;
pub mod ring;
pub mod warp;

pub use multiring::MultiRingStitcher;
pub use ring::RingStitcher;
pub use warp::{warp_frame, Warped};
