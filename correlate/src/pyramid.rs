use crate::buffer::ColorBuffer;

/// Result of a planar alignment search: the best integer pixel offset
/// `(dx, dy)` of `b` relative to `a`, and the pooled variance of the error
/// metric across every sampled candidate (used by the deviation test,
/// §4.2: "the deviation-test rejection triggers when the top-level
/// variance falls below 1.5").
#[derive(Debug, Clone, Copy)]
pub struct AlignResult {
    pub offset: (i32, i32),
    pub variance: f64,
    pub min_error: f64,
}

/// Recursively downsamples both inputs by a factor of 2 until either
/// dimension would drop below 4 pixels at the next level, runs brute-force
/// correlation at the bottom of the pyramid, then refines in a 2-pixel
/// window around 2x the child result at each level going back up (§4.2
/// "Pyramid planar aligner").
pub fn align(a: &ColorBuffer, b: &ColorBuffer, window: (i32, i32)) -> AlignResult {
    let can_descend = a.width / 2 >= 4 && a.height / 2 >= 4 && window.0 > 2 && window.1 > 2;
    if can_descend {
        let da = a.downsample2();
        let db = b.downsample2();
        let child_window = ((window.0 / 2).max(1), (window.1 / 2).max(1));
        let child = align(&da, &db, child_window);
        let center = (child.offset.0 * 2, child.offset.1 * 2);
        brute_force(a, b, center, (2, 2))
    } else {
        brute_force(a, b, (0, 0), window)
    }
}

/// Exhaustively scores every integer offset in `center +/- window`. The
/// error at a candidate shift is the mean, per-pixel sum of squared
/// per-channel differences over the region where both buffers overlap
/// (§4.2: "normed (mean) sum of per-channel squared differences over the
/// overlap at the candidate shift").
fn brute_force(a: &ColorBuffer, b: &ColorBuffer, center: (i32, i32), window: (i32, i32)) -> AlignResult {
    let mut best = (center.0 - window.0, center.1 - window.1);
    let mut best_error = f64::INFINITY;
    let mut errors = Vec::new();

    for dy in (center.1 - window.1)..=(center.1 + window.1) {
        for dx in (center.0 - window.0)..=(center.0 + window.0) {
            let error = sampled_error(a, b, dx, dy);
            if let Some(error) = error {
                errors.push(error);
                if error < best_error {
                    best_error = error;
                    best = (dx, dy);
                }
            }
        }
    }

    let variance = if errors.is_empty() {
        0.0
    } else {
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / errors.len() as f64
    };

    AlignResult {
        offset: best,
        variance,
        min_error: if best_error.is_finite() { best_error } else { 0.0 },
    }
}

/// Mean squared difference between `a` and `b` shifted by `(dx, dy)`,
/// sampled over pixels present in both buffers. `None` if the shift leaves
/// no overlap at all.
fn sampled_error(a: &ColorBuffer, b: &ColorBuffer, dx: i32, dy: i32) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u64;
    for y in 0..a.height as i64 {
        for x in 0..a.width as i64 {
            let av = match a.get(x, y) {
                Some(v) => v,
                None => continue,
            };
            let bv = match b.get(x + dx as i64, y + dy as i64) {
                Some(v) => v,
                None => continue,
            };
            for c in 0..3 {
                let diff = (av[c] - bv[c]) as f64;
                sum += diff * diff;
            }
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn checker(width: u32, height: u32, offset: i64) -> ColorBuffer {
        let mut image = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if ((x as i64 + offset) / 4 + (y as i64) / 4) % 2 == 0 {
                    200
                } else {
                    40
                };
                image.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        ColorBuffer::from_rgb(&image)
    }

    #[test]
    fn finds_known_integer_shift() {
        let a = checker(64, 64, 0);
        let b = checker(64, 64, 3);
        let result = align(&a, &b, (8, 8));
        assert_eq!(result.offset, (3, 0));
    }

    #[test]
    fn zero_shift_for_identical_buffers() {
        let a = checker(32, 32, 0);
        let result = align(&a, &a.clone(), (4, 4));
        assert_eq!(result.offset, (0, 0));
        assert!(result.min_error < 1e-6);
    }

    #[test]
    fn flat_buffer_has_near_zero_variance() {
        let flat = ColorBuffer::from_data(16, 16, vec![[128.0; 3]; 256]);
        let result = align(&flat, &flat.clone(), (3, 3));
        assert!(result.variance < 1e-6);
    }
}
