//! Dynamic-programming seam finding (§4.8) and optical-flow-corrected
//! feather blending (§4.9).

pub mod flow;
pub mod seam;

pub use flow::{calculate_flow, FlowBlender, FlowField};
pub use seam::{seam, SeamDirection, SeamInput};
