use std::fs;
use std::path::PathBuf;

use image::RgbImage;

use panorama_types::error::StitchResult;

use crate::codec::{ImageCodec, LibraryCodec};

/// Writes one JPEG per accepted keyframe to a debug folder, independent of
/// the checkpoint store (§6 "Debug sinks" — a developer convenience, not
/// something finalize reads back).
pub trait DebugSink: Send + Sync {
    fn record_accepted_frame(&self, id: u64, image: &RgbImage) -> StitchResult<()>;
}

pub struct FsDebugSink {
    root: PathBuf,
    codec: LibraryCodec,
}

impl FsDebugSink {
    pub fn new(root: impl Into<PathBuf>) -> StitchResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, codec: LibraryCodec::jpeg() })
    }
}

impl DebugSink for FsDebugSink {
    fn record_accepted_frame(&self, id: u64, image: &RgbImage) -> StitchResult<()> {
        let bytes = self.codec.encode(image)?;
        fs::write(self.root.join(format!("{id}.jpg")), bytes)?;
        Ok(())
    }
}

/// Discards every frame; the default when no debug folder is configured.
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn record_accepted_frame(&self, _id: u64, _image: &RgbImage) -> StitchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_sink_writes_one_file_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDebugSink::new(dir.path()).unwrap();
        sink.record_accepted_frame(7, &RgbImage::new(4, 4)).unwrap();
        assert!(dir.path().join("7.jpg").exists());
    }
}
