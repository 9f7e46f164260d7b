use nalgebra::{Matrix3, Matrix4, Vector3};
use panorama_types::pose::{Pose, Rotation3};

/// Rotation about the X axis by `angle` radians.
pub fn rotation_x(angle: f64) -> Rotation3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

/// Rotation about the Y axis by `angle` radians.
pub fn rotation_y(angle: f64) -> Rotation3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c)
}

/// Rotation about the Z axis by `angle` radians.
pub fn rotation_z(angle: f64) -> Rotation3 {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Per-axis rotation components extracted from a rotation matrix via
/// Euler decomposition in XYZ order (§4.1 "extract per-axis rotation
/// components"), used by the selector's tolerance gate (§4.4 step 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub fn extract_euler_xyz(r: &Rotation3) -> EulerAngles {
    // Standard XYZ decomposition; gimbal-locked at |r[(0,2)]| == 1, which
    // this recorder never approaches in practice (the selector's
    // tolerance gate would already have rejected such a frame).
    let sy = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
    let (x, z) = if sy.cos().abs() > 1e-8 {
        (r[(2, 1)].atan2(r[(2, 2)]), r[(1, 0)].atan2(r[(0, 0)]))
    } else {
        (r[(1, 2)].atan2(r[(1, 1)]), 0.0)
    };
    EulerAngles { x, y: sy, z }
}

/// Angle of rotation between two rotation matrices via the trace formula,
/// clamped to `[-1, 1]` before `acos` (§4.1).
pub fn angle_between(a: &Rotation3, b: &Rotation3) -> f64 {
    let r = a.transpose() * b;
    let trace = r[(0, 0)] + r[(1, 1)] + r[(2, 2)];
    let cos_theta = ((trace - 1.0) / 2.0).clamp(-1.0, 1.0);
    cos_theta.acos()
}

/// Rotation-vector (axis * angle) of `a^-1 * b`, used for the selector's
/// error vector (§4.4 step 6: "error vector = rotation-vector of
/// frame^-1 * ball").
pub fn rotation_vector(a: &Rotation3, b: &Rotation3) -> Vector3<f64> {
    let r = a.transpose() * b;
    let angles = extract_euler_xyz(&r);
    Vector3::new(angles.x, angles.y, angles.z)
}

pub fn to_4x4(r: Rotation3) -> Pose {
    let mut m = Matrix4::identity();
    for row in 0..3 {
        for col in 0..3 {
            m[(row, col)] = r[(row, col)];
        }
    }
    m
}

pub fn rotation_of(pose: &Pose) -> Rotation3 {
    Matrix3::new(
        pose[(0, 0)],
        pose[(0, 1)],
        pose[(0, 2)],
        pose[(1, 0)],
        pose[(1, 1)],
        pose[(1, 2)],
        pose[(2, 0)],
        pose[(2, 1)],
        pose[(2, 2)],
    )
}

/// Replaces the rotation block of a 4x4 pose, keeping translation intact.
pub fn with_rotation(pose: Pose, r: Rotation3) -> Pose {
    let mut m = pose;
    for row in 0..3 {
        for col in 0..3 {
            m[(row, col)] = r[(row, col)];
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn determinant_of_generated_rotation_is_one() {
        for r in [rotation_x(0.3), rotation_y(-1.1), rotation_z(2.4)] {
            assert!((r.determinant() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn angle_between_identical_rotations_is_zero() {
        let r = rotation_y(0.7);
        assert!(angle_between(&r, &r).abs() < 1e-9);
    }

    #[test]
    fn angle_between_orthogonal_rotations() {
        let a = Rotation3::identity();
        let b = rotation_y(std::f64::consts::FRAC_PI_2);
        assert!((angle_between(&a, &b) - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn to_4x4_roundtrips_rotation_block() {
        let r = rotation_z(0.42);
        let pose = to_4x4(r);
        assert_eq!(rotation_of(&pose), r);
    }
}
