use nalgebra::Matrix4;
use once_cell::sync::Lazy;

use crate::pose::Pose;

/// Which mobile platform's sensor axes a pose needs converting from (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

/// `diag(1, -1, -1, 1)` with the extra zero permutation noted in §6.
pub static IOS_BASE: Lazy<Pose> = Lazy::new(|| {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, -1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
});

pub static IOS_ZERO: Lazy<Pose> = Lazy::new(|| {
    Matrix4::new(
        0.0, 0.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
});

/// `diag(-1, -1, 1, 1)`.
pub static ANDROID_BASE: Lazy<Pose> = Lazy::new(|| {
    Matrix4::new(
        -1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
});

pub static ANDROID_ZERO: Lazy<Pose> = Lazy::new(|| Matrix4::identity());

impl Platform {
    pub fn base(self) -> Pose {
        match self {
            Platform::Ios => *IOS_BASE,
            Platform::Android => *ANDROID_BASE,
        }
    }

    pub fn zero(self) -> Pose {
        match self {
            Platform::Ios => *IOS_ZERO,
            Platform::Android => *ANDROID_ZERO,
        }
    }
}

/// Converts a raw sensor pose to the internal stitcher frame: `base *
/// zero * sensor^-1 * base^-1` (§6).
pub fn to_stitcher_frame(platform: Platform, sensor_pose: Pose) -> Pose {
    let base = platform.base();
    let zero = platform.zero();
    let base_inv = base
        .try_inverse()
        .expect("platform base matrix must be invertible");
    let sensor_inv = sensor_pose
        .try_inverse()
        .expect("sensor pose must be invertible");
    base * zero * sensor_inv * base_inv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn android_zero_is_identity() {
        assert_eq!(*ANDROID_ZERO, Matrix4::identity());
    }

    #[test]
    fn stitcher_frame_conversion_is_invertible_by_construction() {
        let pose = Matrix4::<f64>::identity();
        let converted = to_stitcher_frame(Platform::Android, pose);
        assert!(converted.try_inverse().is_some());
    }
}
