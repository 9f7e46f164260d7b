use panorama_types::platform::{to_stitcher_frame, Platform};
use panorama_types::pose::Pose;

/// First pipeline stage: converts a raw sensor pose to the internal
/// stitcher frame before anything downstream (selector, correspondence
/// finder) ever sees it (§6, §2 [SUPPLEMENT] — inlined as a stage here
/// rather than folded into the recorder, per the original's
/// `CoordinateConverter` push/finish sink).
#[derive(Debug, Clone, Copy)]
pub struct CoordinateConverter {
    platform: Platform,
}

impl CoordinateConverter {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn convert(&self, sensor_pose: Pose) -> Pose {
        to_stitcher_frame(self.platform, sensor_pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    #[test]
    fn converting_identity_pose_is_invertible() {
        let converter = CoordinateConverter::new(Platform::Ios);
        let converted = converter.convert(Matrix4::identity());
        assert!(converted.try_inverse().is_some());
    }
}
