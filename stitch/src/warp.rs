use image::{GrayImage, Luma, Rgb, RgbImage};

use panorama_correlate::buffer::bilinear_sample;
use panorama_correlate::footprint;
use panorama_math::rotation::rotation_of;
use panorama_math::sphere::{self, EquirectCanvas};
use panorama_types::frame::Frame;

/// A frame warped onto the shared equirect canvas: the warped pixels and
/// mask (canvas-sized crop at `corner`), and the "core" inner rectangle
/// 1px inset from the warped edges (§4.10 `push`, glossary "Core
/// rectangle").
pub struct Warped {
    pub image: RgbImage,
    pub mask: GrayImage,
    /// Wrap-safe top-left corner of `image`/`mask` on the canvas.
    pub corner: (i64, i64),
    /// Core rectangle, in `image`-local coordinates: `(x, y, w, h)`.
    pub core: (u32, u32, u32, u32),
}

/// Warps `frame` onto `canvas` via its adjusted pose, producing the full
/// warped RGB buffer, an occupancy mask, and the wrap-safe corner (§4.10
/// `push`: "apply the spherical warp... to produce a warped image and its
/// core inner rectangle... compute the wrap-safe top-left corner").
pub fn warp_frame(frame: &Frame, canvas: EquirectCanvas, margin: f64) -> Warped {
    let (min_u, max_u, min_v, max_v) = footprint(frame, canvas, margin);
    let width = (max_u - min_u).ceil().max(1.0) as u32;
    let height = (max_v - min_v).ceil().max(1.0) as u32;

    let intrinsics = frame.intrinsics();
    let rotation = rotation_of(&frame.adjusted_pose());
    let image = frame
        .with_pixels(|image| image.clone())
        .unwrap_or_else(|_| RgbImage::new(1, 1));

    let mut out = RgbImage::new(width, height);
    let mut mask = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let u = min_u + x as f64;
            let v = (min_v + y as f64).clamp(0.0, canvas.height as f64 - 1.0);
            let ray = sphere::equirect_to_ray(u.rem_euclid(canvas.width as f64), v, canvas);
            if let Some((px, py)) = sphere::world_ray_to_pixel(&intrinsics, &rotation, &ray) {
                if let Some([r, g, b]) = bilinear_sample(&image, px, py) {
                    out.put_pixel(x, y, Rgb([r.round() as u8, g.round() as u8, b.round() as u8]));
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }

    // Wrap-safe corner: fold the unwrapped origin back into [0, canvas
    // width) so the multi-ring compositor's arithmetic always stays in
    // canvas-local coordinates, regardless of whether this frame's
    // footprint happened to cross the equirect seam.
    let corner = (min_u.floor().rem_euclid(canvas.width as f64) as i64, min_v.floor() as i64);

    let core = if width > 2 && height > 2 {
        (1, 1, width - 2, height - 2)
    } else {
        (0, 0, width, height)
    };

    Warped { image: out, mask, corner, core }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_correlate::canvas_for_intrinsics;
    use panorama_math::rotation::to_4x4;
    use panorama_types::exposure::Exposure;
    use panorama_types::intrinsics::Intrinsics;

    #[test]
    fn warp_produces_nonempty_mask() {
        let mut image = RgbImage::new(200, 150);
        for y in 0..150 {
            for x in 0..200 {
                image.put_pixel(x, y, Rgb([((x + y) % 255) as u8; 3]));
            }
        }
        let intrinsics = Intrinsics::new(180.0, 180.0, 100.0, 75.0, 200, 150);
        let frame = Frame::from_loaded(image, to_4x4(panorama_math::rotation::rotation_y(0.0)), intrinsics, Exposure::default());
        let canvas = canvas_for_intrinsics(&intrinsics);
        let warped = warp_frame(&frame, canvas, 2.0);
        let any_set = warped.mask.pixels().any(|p| p.0[0] != 0);
        assert!(any_set);
    }
}
