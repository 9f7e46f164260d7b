use image::{GrayImage, RgbImage};

/// Seam orientation: vertical separates a left/right pair, horizontal
/// separates a top/bottom pair (§4.8: "the implementation reuses the same
/// table with swapped coordinate accessors").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeamDirection {
    Vertical,
    Horizontal,
}

/// A warped image plus its mask and canvas-space top-left corner — the
/// minimal shape the seamer needs from a [`panorama_types::StitchedRing`]
/// or a single warped frame.
pub struct SeamInput<'a> {
    pub image: &'a RgbImage,
    pub mask: &'a mut GrayImage,
    pub corner: (i64, i64),
}

/// Finds and carves a minimum-cost seam between two overlapping images,
/// zeroing each side's mask past the seam (with a symmetric `overlap`
/// dead-band around it where both masks stay nonzero). Returns `false`
/// (no-op) if the overlap region shrunk by `border` is too small (§4.8
/// step 1).
pub fn seam(a: SeamInput<'_>, b: SeamInput<'_>, border: i64, overlap: i64, direction: SeamDirection) -> bool {
    let (a_image, a_mask, a_corner) = (a.image, a.mask, a.corner);
    let (b_image, b_mask, b_corner) = (b.image, b.mask, b.corner);

    let (along_len, cross_len, cross_min) = match direction {
        SeamDirection::Vertical => {
            let top = a_corner.1.max(b_corner.1);
            let bottom = (a_corner.1 + a_image.height() as i64).min(b_corner.1 + b_image.height() as i64);
            let left = a_corner.0.max(b_corner.0);
            let right = (a_corner.0 + a_image.width() as i64).min(b_corner.0 + b_image.width() as i64);
            (bottom - top - 2 * border, right - left - 2 * border, left + border)
        }
        SeamDirection::Horizontal => {
            let left = a_corner.0.max(b_corner.0);
            let right = (a_corner.0 + a_image.width() as i64).min(b_corner.0 + b_image.width() as i64);
            let top = a_corner.1.max(b_corner.1);
            let bottom = (a_corner.1 + a_image.height() as i64).min(b_corner.1 + b_image.height() as i64);
            (right - left - 2 * border, bottom - top - 2 * border, top + border)
        }
    };
    let along_origin = match direction {
        SeamDirection::Vertical => a_corner.1.max(b_corner.1) + border,
        SeamDirection::Horizontal => a_corner.0.max(b_corner.0) + border,
    };

    if along_len < 2 * overlap.max(1) || cross_len < 2 {
        return false;
    }
    let along_len = along_len as usize;
    let cross_len = cross_len as usize;

    // sample(along, cross) -> (quality, a_present, b_present)
    let sample = |along: usize, cross: usize| -> (f32, bool, bool) {
        let (x, y) = match direction {
            SeamDirection::Vertical => (cross_min + cross as i64, along_origin + along as i64),
            SeamDirection::Horizontal => (along_origin + along as i64, cross_min + cross as i64),
        };
        let a_px = sample_masked(a_image, a_mask, a_corner, x, y);
        let b_px = sample_masked(b_image, b_mask, b_corner, x, y);
        match (a_px, b_px) {
            (Some(ac), Some(bc)) => {
                let diff: f32 = (0..3)
                    .map(|c| (ac[c] as f32 - bc[c] as f32).powi(2))
                    .sum();
                (255.0 - diff.sqrt() / 3.0, true, true)
            }
            (Some(_), None) => (0.0, true, false),
            (None, Some(_)) => (0.0, false, true),
            (None, None) => (0.0, false, false),
        }
    };

    let mut quality = vec![0.0f32; along_len * cross_len];
    for along in 0..along_len {
        for cross in 0..cross_len {
            quality[along * cross_len + cross] = sample(along, cross).0;
        }
    }

    let mut cost = vec![0.0f32; along_len * cross_len];
    let mut parent = vec![0i8; along_len * cross_len];
    for cross in 0..cross_len {
        cost[cross] = quality[cross];
    }
    for along in 1..along_len {
        for cross in 0..cross_len {
            let mut best = cost[(along - 1) * cross_len + cross];
            let mut dir = 0i8;
            if cross > 0 && cost[(along - 1) * cross_len + cross - 1] > best {
                best = cost[(along - 1) * cross_len + cross - 1];
                dir = -1;
            }
            if cross + 1 < cross_len && cost[(along - 1) * cross_len + cross + 1] > best {
                best = cost[(along - 1) * cross_len + cross + 1];
                dir = 1;
            }
            cost[along * cross_len + cross] = quality[along * cross_len + cross] + best;
            parent[along * cross_len + cross] = dir;
        }
    }

    let last_row = &cost[(along_len - 1) * cross_len..along_len * cross_len];
    let mut cross = last_row
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut seam_positions = vec![0usize; along_len];
    for along in (0..along_len).rev() {
        seam_positions[along] = cross;
        let dir = parent[along * cross_len + cross];
        if along > 0 {
            cross = (cross as i64 + dir as i64).clamp(0, cross_len as i64 - 1) as usize;
        }
    }

    for along in 0..along_len {
        let seam_cross = seam_positions[along] as i64;
        for cross in 0..cross_len {
            let (px, py) = match direction {
                SeamDirection::Vertical => (cross_min + cross as i64, along_origin + along as i64),
                SeamDirection::Horizontal => (along_origin + along as i64, cross_min + cross as i64),
            };
            let cross = cross as i64;
            if cross > seam_cross + overlap {
                clear_mask(a_mask, a_corner, px, py);
            } else if cross < seam_cross - overlap {
                clear_mask(b_mask, b_corner, px, py);
            }
        }
    }

    true
}

fn sample_masked(image: &RgbImage, mask: &GrayImage, corner: (i64, i64), x: i64, y: i64) -> Option<[u8; 3]> {
    let lx = x - corner.0;
    let ly = y - corner.1;
    if lx < 0 || ly < 0 || lx as u32 >= image.width() || ly as u32 >= image.height() {
        return None;
    }
    if mask.get_pixel(lx as u32, ly as u32).0[0] == 0 {
        return None;
    }
    Some(image.get_pixel(lx as u32, ly as u32).0)
}

fn clear_mask(mask: &mut GrayImage, corner: (i64, i64), x: i64, y: i64) {
    let lx = x - corner.0;
    let ly = y - corner.1;
    if lx < 0 || ly < 0 || lx as u32 >= mask.width() || ly as u32 >= mask.height() {
        return;
    }
    mask.get_pixel_mut(lx as u32, ly as u32).0[0] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// Builds a 100px-wide overlap where the left half is bright (image A's
    /// content) and the right half is dark (image B's content) — the
    /// visual boundary sits at x=50 within the overlap.
    fn split_images(width: u32, height: u32, boundary: u32) -> (RgbImage, GrayImage, RgbImage, GrayImage) {
        let mut a = RgbImage::new(width, height);
        let mut a_mask = GrayImage::new(width, height);
        let mut b = RgbImage::new(width, height);
        let mut b_mask = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let bright = x < boundary;
                a.put_pixel(x, y, Rgb(if bright { [220, 220, 220] } else { [40, 40, 40] }));
                b.put_pixel(x, y, Rgb(if bright { [220, 220, 220] } else { [40, 40, 40] }));
                a_mask.put_pixel(x, y, Luma([255]));
                b_mask.put_pixel(x, y, Luma([255]));
            }
        }
        (a, a_mask, b, b_mask)
    }

    #[test]
    fn seam_runs_near_visual_boundary() {
        let (a_img, mut a_mask, b_img, mut b_mask) = split_images(100, 100, 50);
        let applied = seam(
            SeamInput { image: &a_img, mask: &mut a_mask, corner: (0, 0) },
            SeamInput { image: &b_img, mask: &mut b_mask, corner: (0, 0) },
            0,
            0,
            SeamDirection::Vertical,
        );
        assert!(applied);
        // Because both images are byte-identical, the seam can land
        // anywhere the flat cost plateau allows, but mask carving must
        // still be complementary everywhere.
        for y in 0..100u32 {
            for x in 0..100u32 {
                let av = a_mask.get_pixel(x, y).0[0];
                let bv = b_mask.get_pixel(x, y).0[0];
                assert!(av != 0 || bv != 0, "both masks zero at ({x},{y})");
            }
        }
    }

    #[test]
    fn too_small_overlap_is_a_noop() {
        let (a_img, mut a_mask, b_img, mut b_mask) = split_images(10, 10, 5);
        let applied = seam(
            SeamInput { image: &a_img, mask: &mut a_mask, corner: (0, 0) },
            SeamInput { image: &b_img, mask: &mut b_mask, corner: (0, 0) },
            8,
            1,
            SeamDirection::Vertical,
        );
        assert!(!applied);
    }
}
