use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Camera intrinsics: focal length (fx, fy) and principal point (cx, cy),
/// stored both as named fields (for the scaling math in `panorama-math`)
/// and convertible to/from the 3x3 matrix form used by the correlator and
/// warper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    pub fn to_matrix3(self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    pub fn from_matrix3(m: Matrix3<f64>, width: u32, height: u32) -> Self {
        Self {
            fx: m[(0, 0)],
            fy: m[(1, 1)],
            cx: m[(0, 2)],
            cy: m[(1, 2)],
            width,
            height,
        }
    }

    /// Horizontal/vertical field of view implied by these intrinsics, in
    /// radians (§4.3: `V`/`F` derivation for the recorder graph generator).
    pub fn fov(&self) -> (f64, f64) {
        let h_fov = 2.0 * ((self.width as f64 / 2.0) / self.fx).atan();
        let v_fov = 2.0 * ((self.height as f64 / 2.0) / self.fy).atan();
        (h_fov, v_fov)
    }

    /// 9-element row-major serialization, matching the `intrinsics[9]`
    /// field of the `raw_images/<id>.json` checkpoint schema (§6).
    pub fn to_array9(self) -> [f64; 9] {
        let m = self.to_matrix3();
        let mut out = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 3 + c] = m[(r, c)];
            }
        }
        out
    }

    pub fn from_array9(a: [f64; 9], width: u32, height: u32) -> Self {
        let m = Matrix3::new(a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7], a[8]);
        Self::from_matrix3(m, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn array9_roundtrip() {
        let intrinsics = Intrinsics::new(1000.0, 1000.0, 512.0, 384.0, 1024, 768);
        let restored = Intrinsics::from_array9(intrinsics.to_array9(), 1024, 768);
        assert_eq!(intrinsics, restored);
    }
}
