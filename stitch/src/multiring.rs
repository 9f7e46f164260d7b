use image::{GenericImageView, GrayImage, Luma, RgbImage};

use panorama_blend::{seam, FlowBlender, FlowField, SeamDirection, SeamInput};
use panorama_types::stitched_ring::StitchedRing;

/// Border/overlap passed to the horizontal seamer between adjacent rings
/// (§4.11 step 3).
const SEAM_BORDER: i64 = 16;
const SEAM_OVERLAP: i64 = 16;

/// Composites a set of per-ring stitched results into the final
/// panorama: vertical alignment between consecutive rings, horizontal
/// seaming, then a feather-blended composite (§4.11).
pub struct MultiRingStitcher {
    rings: Vec<StitchedRing>,
}

impl MultiRingStitcher {
    pub fn new(mut rings: Vec<StitchedRing>) -> Self {
        rings.sort_by_key(|r| r.ring_id);
        Self { rings }
    }

    /// Estimates a translation-only vertical offset between each
    /// consecutive ring pair and applies it cumulatively to ring corners
    /// so neighboring rings align (§4.11 step 2). The pairwise correlator
    /// stands in for a dedicated ECC solver, restricted to the vertical
    /// axis by only reading `angular_offset`'s pixel-equivalent `dy`.
    pub fn align_vertically(&mut self) {
        let mut cumulative_dy = 0i64;
        for i in 1..self.rings.len() {
            let dy = estimate_vertical_offset(&self.rings[i - 1], &self.rings[i]);
            cumulative_dy += dy;
            self.rings[i].corner.1 += cumulative_dy;
        }
    }

    /// Runs the horizontal dynamic seamer between every adjacent ring
    /// pair (§4.11 step 3).
    pub fn seam_adjacent_rings(&mut self) {
        for i in 0..self.rings.len().saturating_sub(1) {
            let (left, right) = self.rings.split_at_mut(i + 1);
            let a = left.last_mut().unwrap();
            let b = &mut right[0];
            let (a_image, a_mask, a_corner) = (&a.image, &mut a.mask, a.corner);
            let (b_image, b_mask, b_corner) = (&b.image, &mut b.mask, b.corner);
            let applied = seam(
                SeamInput { image: a_image, mask: a_mask, corner: a_corner },
                SeamInput { image: b_image, mask: b_mask, corner: b_corner },
                SEAM_BORDER,
                SEAM_OVERLAP,
                SeamDirection::Horizontal,
            );
            a.seamed |= applied;
            b.seamed |= applied;
        }
    }

    /// Composes every ring into the final canvas with a feather blender
    /// (§4.11 step 4).
    pub fn composite(self) -> (RgbImage, GrayImage) {
        if self.rings.is_empty() {
            return (RgbImage::new(0, 0), GrayImage::new(0, 0));
        }
        let (min_x, min_y, max_x, max_y) = self.rings.iter().fold(
            (i64::MAX, i64::MAX, i64::MIN, i64::MIN),
            |(min_x, min_y, max_x, max_y), ring| {
                (
                    min_x.min(ring.corner.0),
                    min_y.min(ring.corner.1),
                    max_x.max(ring.corner.0 + ring.image.width() as i64),
                    max_y.max(ring.corner.1 + ring.image.height() as i64),
                )
            },
        );
        let width = (max_x - min_x).max(1) as u32;
        let height = (max_y - min_y).max(1) as u32;

        let mut blender = FlowBlender::new(width, height);
        for mut ring in self.rings {
            // Force a feather boundary at the top/bottom of every ring so
            // vertically adjacent rings blend rather than hard-cut
            // (§4.11 step 4: "blacken the top and bottom row of each
            // mask").
            blacken_top_bottom_row(&mut ring.mask);
            let corner = (ring.corner.0 - min_x, ring.corner.1 - min_y);
            let flow = FlowField::zero(ring.image.width(), ring.image.height());
            blender.feed(&ring.image, &flow, corner);
        }
        blender.into_result()
    }
}

fn blacken_top_bottom_row(mask: &mut GrayImage) {
    let width = mask.width();
    if mask.height() == 0 {
        return;
    }
    for x in 0..width {
        mask.put_pixel(x, 0, Luma([0]));
        mask.put_pixel(x, mask.height() - 1, Luma([0]));
    }
}

/// Cross-correlates the overlapping band of two ring images (grayscale,
/// translation-only) to estimate the vertical offset needed to align
/// them, seeded from the corners' own implied delta (§4.11 step 2).
fn estimate_vertical_offset(a: &StitchedRing, b: &StitchedRing) -> i64 {
    let hint = b.corner.1 - (a.corner.1 + a.image.height() as i64);
    let overlap_width = a.image.width().min(b.image.width());
    if overlap_width == 0 || a.image.height() == 0 || b.image.height() == 0 {
        return hint;
    }

    let search = 8i64;
    let mut best_dy = hint;
    let mut best_error = f64::INFINITY;
    let band_a = a.image.view(0, a.image.height().saturating_sub(16), overlap_width, a.image.height().min(16));
    for dy in -search..=search {
        let mut sum = 0.0;
        let mut count = 0u32;
        for (x, y, pixel) in band_a.pixels() {
            let by = y as i64 + dy;
            if by < 0 || by as u32 >= b.image.height() || x >= overlap_width {
                continue;
            }
            let bp = b.image.get_pixel(x, by as u32).0;
            for c in 0..3 {
                let diff = pixel.0[c] as f64 - bp[c] as f64;
                sum += diff * diff;
            }
            count += 1;
        }
        if count > 0 {
            let error = sum / count as f64;
            if error < best_error {
                best_error = error;
                best_dy = hint + dy;
            }
        }
    }
    best_dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_ring(ring_id: u32, corner: (i64, i64), w: u32, h: u32, value: u8) -> StitchedRing {
        let mut image = RgbImage::new(w, h);
        for px in image.pixels_mut() {
            *px = Rgb([value, value, value]);
        }
        let mut mask = GrayImage::new(w, h);
        for px in mask.pixels_mut() {
            *px = Luma([255]);
        }
        StitchedRing { image, mask, corner, ring_id, seamed: false }
    }

    #[test]
    fn composite_covers_union_of_ring_rois() {
        let rings = vec![
            solid_ring(0, (0, 0), 40, 20, 200),
            solid_ring(1, (10, 20), 40, 20, 50),
        ];
        let mut stitcher = MultiRingStitcher::new(rings);
        stitcher.align_vertically();
        stitcher.seam_adjacent_rings();
        let (image, mask) = stitcher.composite();
        assert!(image.width() >= 50);
        assert!(mask.pixels().any(|p| p.0[0] != 0));
    }

    #[test]
    fn empty_ring_set_yields_empty_canvas() {
        let stitcher = MultiRingStitcher::new(vec![]);
        let (image, _mask) = stitcher.composite();
        assert_eq!(image.width(), 0);
    }
}
