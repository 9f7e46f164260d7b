use image::{ImageFormat, RgbImage};

use panorama_types::error::{StitchError, StitchResult};

/// Boundary to the out-of-scope image codec (§1 "Out of scope": "the
/// mono-to-stereo ray-synthesis warp... UI/preview rendering" and friends
/// are external collaborators; BMP/JPEG encode/decode is the same kind of
/// boundary — this crate only promises the interface, backed here by
/// whatever the `image` crate itself supports).
pub trait ImageCodec: Send + Sync {
    fn encode(&self, image: &RgbImage) -> StitchResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8], width: u32, height: u32) -> StitchResult<RgbImage>;
}

/// Thin wrapper over `image`'s own encoder/decoder for a fixed
/// [`ImageFormat`] (BMP for `raw_images/`/ring checkpoints, matching §6).
pub struct LibraryCodec {
    format: ImageFormat,
}

impl LibraryCodec {
    pub fn bmp() -> Self {
        Self { format: ImageFormat::Bmp }
    }

    pub fn jpeg() -> Self {
        Self { format: ImageFormat::Jpeg }
    }
}

impl ImageCodec for LibraryCodec {
    fn encode(&self, image: &RgbImage) -> StitchResult<Vec<u8>> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut buf, self.format)
            .map_err(|e| StitchError::Io(std::io::Error::other(e.to_string())))?;
        Ok(buf.into_inner())
    }

    fn decode(&self, bytes: &[u8], _width: u32, _height: u32) -> StitchResult<RgbImage> {
        image::load_from_memory_with_format(bytes, self.format)
            .map(|dyn_image| dyn_image.to_rgb8())
            .map_err(|e| StitchError::Io(std::io::Error::other(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_roundtrip_preserves_dimensions() {
        let image = RgbImage::new(4, 3);
        let codec = LibraryCodec::bmp();
        let bytes = codec.encode(&image).unwrap();
        let decoded = codec.decode(&bytes, 4, 3).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
    }
}
