use image::RgbImage;

/// Bilinear sample of an `RgbImage` at continuous coordinates, `None` if
/// any of the four supporting pixels falls outside the image.
pub fn bilinear_sample(image: &RgbImage, x: f64, y: f64) -> Option<[f32; 3]> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let (width, height) = image.dimensions();
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;
    if x1 as u32 >= width || y1 as u32 >= height {
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

/// A three-channel RGB buffer used for correlation error metrics. Kept
/// separate from `image::RgbImage` so downsampling/error computation can
/// stay in `f32` without repeated quantization loss across pyramid levels
/// (§4.2: the error metric is "the normed (mean) sum of per-channel
/// squared differences over the overlap," so the channels have to survive
/// all the way down to `sampled_error`).
#[derive(Debug, Clone)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<[f32; 3]>,
}

impl ColorBuffer {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in image.pixels() {
            let [r, g, b] = px.0;
            data.push([r as f32, g as f32, b as f32]);
        }
        Self { width, height, data }
    }

    pub fn from_data(width: u32, height: u32, data: Vec<[f32; 3]>) -> Self {
        Self { width, height, data }
    }

    pub fn get(&self, x: i64, y: i64) -> Option<[f32; 3]> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(self.data[(y as u32 * self.width + x as u32) as usize])
    }

    /// Box-filter downsample by a factor of 2, rounding dimensions down.
    pub fn downsample2(&self) -> ColorBuffer {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut data = vec![[0.0f32; 3]; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let x0 = (x * 2) as i64;
                let y0 = (y * 2) as i64;
                let mut sum = [0.0f32; 3];
                let mut count = 0.0f32;
                for dy in 0..2 {
                    for dx in 0..2 {
                        if let Some(v) = self.get(x0 + dx, y0 + dy) {
                            for c in 0..3 {
                                sum[c] += v[c];
                            }
                            count += 1.0;
                        }
                    }
                }
                data[(y * width + x) as usize] = if count > 0.0 { [sum[0] / count, sum[1] / count, sum[2] / count] } else { [0.0; 3] };
            }
        }
        ColorBuffer { width, height, data }
    }
}
