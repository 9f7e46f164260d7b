use panorama_math::rotation::rotation_of;
use panorama_math::sphere::{self, EquirectCanvas};
use panorama_types::error::StitchResult;
use panorama_types::frame::Frame;

use crate::buffer::{bilinear_sample, ColorBuffer};

/// Minimum overlap region size below which a pair is rejected as
/// `NoOverlap` (§4.2: "if either region is smaller than (4,4) pixels").
pub const MIN_OVERLAP_DIM: u32 = 4;

/// A rectangular region (in shared equirectangular canvas pixels, with
/// `u` measured relative to `a`'s own footprint so wraparound near +/-180
/// degrees never splits the overlap) warped out of both frames for
/// correlation.
pub struct Overlap {
    pub a: ColorBuffer,
    pub b: ColorBuffer,
}

/// Builds a canvas whose resolution roughly matches the source frames:
/// one equirect pixel per source pixel at the horizon, so the pyramid
/// aligner's pixel-offset results map cleanly back to frame intrinsics.
fn shared_canvas(a: &Frame, b: &Frame) -> EquirectCanvas {
    let ca = canvas_for_intrinsics(&a.intrinsics());
    let cb = canvas_for_intrinsics(&b.intrinsics());
    let width = ((ca.width + cb.width) / 2).max(16);
    let height = (width / 2).max(8);
    EquirectCanvas { width, height }
}

/// Equirect canvas resolution matched to a single frame's intrinsics: one
/// canvas pixel per source pixel at the horizon. Used both for pairwise
/// overlap extraction (averaged over the pair) and, in `panorama-stitch`,
/// as the single shared panorama canvas every ring warps onto.
pub fn canvas_for_intrinsics(intrinsics: &panorama_types::intrinsics::Intrinsics) -> EquirectCanvas {
    let (hfov, _) = intrinsics.fov();
    let px_per_rad = intrinsics.width as f64 / hfov;
    let width = (px_per_rad * 2.0 * std::f64::consts::PI).round().max(16.0) as u32;
    let height = (width / 2).max(8);
    EquirectCanvas { width, height }
}

/// Projects the four corners of a frame's image plane onto the canvas and
/// returns the bounding box, in `u` coordinates unwrapped relative to the
/// frame's own center ray so the box never straddles the wrap seam.
pub fn footprint(frame: &Frame, canvas: EquirectCanvas, margin: f64) -> (f64, f64, f64, f64) {
    let intrinsics = frame.intrinsics();
    let rotation = rotation_of(&frame.adjusted_pose());
    let center_ray = sphere::pixel_to_world_ray(
        &intrinsics,
        &rotation,
        intrinsics.width as f64 / 2.0,
        intrinsics.height as f64 / 2.0,
    );
    let (center_u, _) = sphere::ray_to_equirect_unwrapped(&center_ray, canvas);

    let corners = [
        (0.0, 0.0),
        (intrinsics.width as f64, 0.0),
        (0.0, intrinsics.height as f64),
        (intrinsics.width as f64, intrinsics.height as f64),
        (intrinsics.width as f64 / 2.0, 0.0),
        (intrinsics.width as f64 / 2.0, intrinsics.height as f64),
        (0.0, intrinsics.height as f64 / 2.0),
        (intrinsics.width as f64, intrinsics.height as f64 / 2.0),
    ];

    let (mut min_u, mut max_u, mut min_v, mut max_v) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (px, py) in corners {
        let ray = sphere::pixel_to_world_ray(&intrinsics, &rotation, px, py);
        let (u, v) = sphere::ray_to_equirect_unwrapped(&ray, canvas);
        // Unwrap relative to the center so a footprint crossing the seam
        // stays contiguous.
        let mut u = u;
        while u - center_u > canvas.width as f64 / 2.0 {
            u -= canvas.width as f64;
        }
        while u - center_u < -(canvas.width as f64 / 2.0) {
            u += canvas.width as f64;
        }
        min_u = min_u.min(u);
        max_u = max_u.max(u);
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }

    (min_u - margin, max_u + margin, min_v - margin, max_v + margin)
}

/// Extracts the overlapping region of two frames, buffered by `margin`
/// canvas pixels, by warping both onto a shared equirectangular patch
/// (§4.2: "project both frames onto a shared spherical warp, extract the
/// overlapping warped region buffered by configurable margins").
///
/// Returns `None` if the frames' footprints don't intersect, or the
/// intersection is smaller than [`MIN_OVERLAP_DIM`] in either dimension.
pub fn extract_overlap(a: &Frame, b: &Frame, margin: f64) -> StitchResult<Option<Overlap>> {
    let canvas = shared_canvas(a, b);
    let (a_min_u, a_max_u, a_min_v, a_max_v) = footprint(a, canvas, margin);
    let (b_min_u, b_max_u, b_min_v, b_max_v) = footprint(b, canvas, margin);

    let min_u = a_min_u.max(b_min_u);
    let max_u = a_max_u.min(b_max_u);
    let min_v = a_min_v.max(b_min_v);
    let max_v = a_max_v.min(b_max_v);

    let width = (max_u - min_u).floor() as i64;
    let height = (max_v - min_v).floor() as i64;
    if width < MIN_OVERLAP_DIM as i64 || height < MIN_OVERLAP_DIM as i64 {
        return Ok(None);
    }

    let a_buf = warp_region(a, canvas, min_u, min_v, width as u32, height as u32);
    let b_buf = warp_region(b, canvas, min_u, min_v, width as u32, height as u32);
    Ok(Some(Overlap { a: a_buf, b: b_buf }))
}

/// Inverse-warps a `width` x `height` window of the canvas, starting at
/// `(origin_u, origin_v)`, back into `frame`'s own pixels via bilinear
/// sampling. Canvas pixels that fall outside `frame`'s image plane are
/// filled with zero.
pub fn warp_region(frame: &Frame, canvas: EquirectCanvas, origin_u: f64, origin_v: f64, width: u32, height: u32) -> ColorBuffer {
    let intrinsics = frame.intrinsics();
    let rotation = rotation_of(&frame.adjusted_pose());
    let mut data = vec![[0.0f32; 3]; (width * height) as usize];
    let image = frame
        .with_pixels(|image| image.clone())
        .unwrap_or_else(|_| image::RgbImage::new(1, 1));

    for y in 0..height {
        for x in 0..width {
            let u = origin_u + x as f64;
            let v = origin_v + y as f64;
            let ray = sphere::equirect_to_ray(u.rem_euclid(canvas.width as f64), v.clamp(0.0, canvas.height as f64 - 1.0), canvas);
            if let Some((px, py)) = sphere::world_ray_to_pixel(&intrinsics, &rotation, &ray) {
                if let Some(rgb) = bilinear_sample(&image, px, py) {
                    data[(y * width + x) as usize] = rgb;
                }
            }
        }
    }

    ColorBuffer::from_data(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use panorama_math::rotation::{rotation_y, to_4x4};
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;

    fn frame_with_yaw(yaw: f64) -> Frame {
        let mut image = RgbImage::new(256, 192);
        for y in 0..192 {
            for x in 0..256 {
                let v = ((x / 8 + y / 8) % 2 * 160 + 40) as u8;
                image.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        let intrinsics = Intrinsics::new(200.0, 200.0, 128.0, 96.0, 256, 192);
        Frame::from_loaded(image, to_4x4(rotation_y(yaw)), intrinsics, Exposure::default())
    }

    #[test]
    fn adjacent_frames_overlap() {
        let a = frame_with_yaw(0.0);
        let b = frame_with_yaw(0.3);
        let overlap = extract_overlap(&a, &b, 4.0).unwrap();
        assert!(overlap.is_some());
        let overlap = overlap.unwrap();
        assert!(overlap.a.width >= MIN_OVERLAP_DIM);
        assert!(overlap.a.height >= MIN_OVERLAP_DIM);
        assert_eq!(overlap.a.width, overlap.b.width);
    }

    #[test]
    fn antipodal_frames_have_no_overlap() {
        let a = frame_with_yaw(0.0);
        let b = frame_with_yaw(std::f64::consts::PI);
        let overlap = extract_overlap(&a, &b, 4.0).unwrap();
        assert!(overlap.is_none());
    }
}
