//! The alignment graph and its global per-frame rotation solve (§4.6).

pub mod graph;
pub mod solve;

pub use graph::{AlignmentGraph, FORCED_OVERLAP_WEIGHT};
pub use solve::{apply, solve as solve_graph, Solution};
