//! Recorder graph generation (§4.3), the feedback image selector state
//! machine (§4.4), and ring closure (§4.5).

pub mod generator;
pub mod ring_closer;
pub mod selector;

pub use generator::{generate, sparsify};
pub use ring_closer::close_ring;
pub use selector::{Selector, Tolerance, BALL_LEAD};
