use panorama_types::intrinsics::Intrinsics;

/// Scales intrinsics to a target image size: focal scales by the width
/// ratio, principal point recenters to the new image center (§4.1).
pub fn scale_to_size(intrinsics: &Intrinsics, width: u32, height: u32) -> Intrinsics {
    let scale = width as f64 / intrinsics.width as f64;
    Intrinsics {
        fx: intrinsics.fx * scale,
        fy: intrinsics.fy * scale,
        cx: width as f64 / 2.0,
        cy: height as f64 / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_preserves_focal_to_width_ratio() {
        let intrinsics = Intrinsics::new(1200.0, 1150.0, 510.0, 380.0, 1024, 768);
        let scaled = scale_to_size(&intrinsics, 2048, 1536);
        let back = scale_to_size(&scaled, 1024, 768);
        assert!((back.fx / back.width as f64 - intrinsics.fx / intrinsics.width as f64).abs() < 1e-9);
        assert!((back.cx / back.width as f64 - intrinsics.cx / intrinsics.width as f64).abs() < 1e-9);
    }
}
