use nalgebra::{Matrix4, UnitQuaternion};
use panorama_types::pose::Pose;

use crate::rotation::{rotation_of, with_rotation};

const MIN_SIN_OMEGA: f64 = 1e-10;

/// Spherical interpolation between two poses' rotation blocks via a
/// quaternion round-trip, translation linearly interpolated (§4.1).
///
/// Guarantees: `slerp(a, a, t) == a`; `slerp(a, b, 0) == a`;
/// `slerp(a, b, 1) == b` (within ε); determinant of the interpolated
/// rotation is 1 within ε.
pub fn slerp(a: &Pose, b: &Pose, t: f64) -> Pose {
    let qa = UnitQuaternion::from_matrix(&rotation_of(a));
    let mut qb = UnitQuaternion::from_matrix(&rotation_of(b));

    let mut dot = qa.dot(&qb);
    // Choose the shorter arc.
    if dot < 0.0 {
        qb = UnitQuaternion::new_unchecked(-qb.into_inner());
        dot = -dot;
    }
    let dot = dot.clamp(-1.0, 1.0);

    let omega = dot.acos();
    let sin_omega = omega.sin();

    let interpolated = if sin_omega.abs() < MIN_SIN_OMEGA {
        // a and b are (nearly) identical; avoid a division blow-up and
        // fall back to linear blend of the quaternion components.
        let blended = qa.into_inner().lerp(&qb.into_inner(), t);
        UnitQuaternion::from_quaternion(blended)
    } else {
        let w_a = ((1.0 - t) * omega).sin() / sin_omega;
        let w_b = (t * omega).sin() / sin_omega;
        let blended = qa.into_inner() * w_a + qb.into_inner() * w_b;
        UnitQuaternion::from_quaternion(blended)
    };

    let translation_a = a.fixed_view::<3, 1>(0, 3).clone_owned();
    let translation_b = b.fixed_view::<3, 1>(0, 3).clone_owned();
    let translation = translation_a.lerp(&translation_b, t);

    let mut pose = with_rotation(Matrix4::identity(), *interpolated.to_rotation_matrix().matrix());
    pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    pose
}

/// Linear interpolation between two poses (no normalization of the
/// rotation block — used where the caller only needs a translation-ish
/// blend, e.g. corner alignment hints).
pub fn lerp(a: &Pose, b: &Pose, t: f64) -> Pose {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::rotation_y;
    use panorama_types::pose::Pose;

    fn pose_from_rotation(angle: f64) -> Pose {
        crate::rotation::to_4x4(rotation_y(angle))
    }

    #[test]
    fn slerp_at_zero_is_a() {
        let a = pose_from_rotation(0.2);
        let b = pose_from_rotation(1.4);
        let result = slerp(&a, &b, 0.0);
        for i in 0..3 {
            for j in 0..3 {
                assert!((result[(i, j)] - a[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn slerp_at_one_is_b() {
        let a = pose_from_rotation(0.2);
        let b = pose_from_rotation(1.4);
        let result = slerp(&a, &b, 1.0);
        for i in 0..3 {
            for j in 0..3 {
                assert!((result[(i, j)] - b[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn slerp_identical_poses_is_identity_blend() {
        let a = pose_from_rotation(0.5);
        let result = slerp(&a, &a, 0.37);
        for i in 0..3 {
            for j in 0..3 {
                assert!((result[(i, j)] - a[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn slerp_determinant_is_one() {
        let a = pose_from_rotation(0.1);
        let b = pose_from_rotation(2.0);
        let result = slerp(&a, &b, 0.3);
        let r = crate::rotation::rotation_of(&result);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quaternion_roundtrip_preserves_matrix() {
        let r = rotation_y(0.93);
        let q = UnitQuaternion::from_matrix(&r);
        let back = q.to_rotation_matrix();
        for i in 0..3 {
            for j in 0..3 {
                assert!((back[(i, j)] - r[(i, j)]).abs() < 1e-9);
            }
        }
    }
}
