use nalgebra::{Matrix3, Matrix4};

/// A 4x4 rotation+translation pose, as produced by the sensor/coordinate
/// converter and mutated by the alignment stages (§3).
pub type Pose = Matrix4<f64>;

/// A 3x3 rotation-only matrix, as stored on each recorder-graph
/// [`crate::graph::SelectionPoint`] (§3).
pub type Rotation3 = Matrix3<f64>;
