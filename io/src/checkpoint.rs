use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use panorama_types::checkpoint::{ExposureDoc, OffsetsDoc, RingDataDoc, RingsDoc};
use panorama_types::error::{StitchError, StitchResult};

/// Checkpoint persistence boundary (§6). Every write is expected to be
/// atomic so a crash mid-write never leaves a half-written document for
/// the next run to trip over, using a tree of small per-artifact
/// documents rather than one big serialized state.
pub trait CheckpointStore: Send + Sync {
    fn write_frame_image(&self, id: u64, bytes: &[u8]) -> StitchResult<()>;
    fn write_frame_record(&self, id: u64, record: &panorama_types::checkpoint::FrameRecord) -> StitchResult<()>;
    fn write_rings(&self, doc: &RingsDoc) -> StitchResult<()>;
    fn write_exposure(&self, doc: &ExposureDoc) -> StitchResult<()>;
    fn write_offsets(&self, doc: &OffsetsDoc) -> StitchResult<()>;
    fn write_ring_result(&self, ring_id: u32, image_bytes: &[u8], mask_bytes: &[u8], data: &RingDataDoc) -> StitchResult<()>;
    fn write_optograph(&self, image_bytes: &[u8], mask_bytes: &[u8], data: &RingDataDoc) -> StitchResult<()>;

    /// True if `raw_images/` already holds frames from a prior, unfinished
    /// recording (§6 "resuming a recording").
    fn has_unstitched_recording(&self) -> bool;

    /// Whether this store can serve `raw_images/<id>.bmp` back out for a
    /// paged re-read during finalize, vs. keeping every frame resident.
    fn supports_paging(&self) -> bool;

    fn clear(&self) -> StitchResult<()>;
}

/// Filesystem-backed store rooted at a recording directory, laid out
/// exactly as §6 describes: `raw_images/`, `rings/`, `optograph/`,
/// `rings.json`, `exposure.json`, `offsets.json`.
pub struct FsCheckpointStore {
    root: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> StitchResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("raw_images"))?;
        fs::create_dir_all(root.join("rings"))?;
        fs::create_dir_all(root.join("optograph"))?;
        Ok(Self { root })
    }

    fn raw_image_path(&self, id: u64) -> PathBuf {
        self.root.join("raw_images").join(format!("{id}.bmp"))
    }

    fn raw_record_path(&self, id: u64) -> PathBuf {
        self.root.join("raw_images").join(format!("{id}.json"))
    }
}

/// Writes `bytes` to `path` via a sibling temp file + rename so readers
/// never observe a partial file (mirrors `utils::persistence`'s
/// `NamedTempFile`-then-`std::fs::rename` pattern).
fn atomic_write(path: &Path, bytes: &[u8]) -> StitchResult<()> {
    let dir = path.parent().ok_or_else(|| StitchError::MissingCheckpointFile(path.to_path_buf()))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.persist(path).map_err(|e| StitchError::Io(e.error))?;
    Ok(())
}

fn atomic_write_json(path: &Path, value: &impl Serialize) -> StitchResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes)
}

impl CheckpointStore for FsCheckpointStore {
    fn write_frame_image(&self, id: u64, bytes: &[u8]) -> StitchResult<()> {
        atomic_write(&self.raw_image_path(id), bytes)
    }

    fn write_frame_record(&self, id: u64, record: &panorama_types::checkpoint::FrameRecord) -> StitchResult<()> {
        atomic_write_json(&self.raw_record_path(id), record)
    }

    fn write_rings(&self, doc: &RingsDoc) -> StitchResult<()> {
        atomic_write_json(&self.root.join("rings.json"), doc)
    }

    fn write_exposure(&self, doc: &ExposureDoc) -> StitchResult<()> {
        atomic_write_json(&self.root.join("exposure.json"), doc)
    }

    fn write_offsets(&self, doc: &OffsetsDoc) -> StitchResult<()> {
        atomic_write_json(&self.root.join("offsets.json"), doc)
    }

    fn write_ring_result(&self, ring_id: u32, image_bytes: &[u8], mask_bytes: &[u8], data: &RingDataDoc) -> StitchResult<()> {
        let dir = self.root.join("rings");
        atomic_write(&dir.join(format!("ring_{ring_id}.bmp")), image_bytes)?;
        atomic_write(&dir.join(format!("ring_{ring_id}.mask.bmp")), mask_bytes)?;
        atomic_write_json(&dir.join(format!("ring_{ring_id}.data.json")), data)
    }

    fn write_optograph(&self, image_bytes: &[u8], mask_bytes: &[u8], data: &RingDataDoc) -> StitchResult<()> {
        let dir = self.root.join("optograph");
        atomic_write(&dir.join("result.bmp"), image_bytes)?;
        atomic_write(&dir.join("result.mask.bmp"), mask_bytes)?;
        atomic_write_json(&dir.join("result.data.json"), data)
    }

    fn has_unstitched_recording(&self) -> bool {
        fs::read_dir(self.root.join("raw_images"))
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    fn supports_paging(&self) -> bool {
        true
    }

    fn clear(&self) -> StitchResult<()> {
        for sub in ["raw_images", "rings", "optograph"] {
            let dir = self.root.join(sub);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
                fs::create_dir_all(&dir)?;
            }
        }
        for doc in ["rings.json", "exposure.json", "offsets.json"] {
            let path = self.root.join(doc);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// No-op store for callers that don't want checkpointing (in-memory runs,
/// tests, or a pipeline configured to hold everything resident).
pub struct NullCheckpointStore;

impl CheckpointStore for NullCheckpointStore {
    fn write_frame_image(&self, _id: u64, _bytes: &[u8]) -> StitchResult<()> {
        Ok(())
    }

    fn write_frame_record(&self, _id: u64, _record: &panorama_types::checkpoint::FrameRecord) -> StitchResult<()> {
        Ok(())
    }

    fn write_rings(&self, _doc: &RingsDoc) -> StitchResult<()> {
        Ok(())
    }

    fn write_exposure(&self, _doc: &ExposureDoc) -> StitchResult<()> {
        Ok(())
    }

    fn write_offsets(&self, _doc: &OffsetsDoc) -> StitchResult<()> {
        Ok(())
    }

    fn write_ring_result(&self, _ring_id: u32, _image_bytes: &[u8], _mask_bytes: &[u8], _data: &RingDataDoc) -> StitchResult<()> {
        Ok(())
    }

    fn write_optograph(&self, _image_bytes: &[u8], _mask_bytes: &[u8], _data: &RingDataDoc) -> StitchResult<()> {
        Ok(())
    }

    fn has_unstitched_recording(&self) -> bool {
        false
    }

    fn supports_paging(&self) -> bool {
        false
    }

    fn clear(&self) -> StitchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panorama_types::checkpoint::ExposureEntry;

    #[test]
    fn fs_store_roundtrips_rings_doc() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path()).unwrap();
        let doc = RingsDoc { rings: vec![vec![0, 1, 2], vec![3, 4]] };
        store.write_rings(&doc).unwrap();
        let bytes = fs::read(dir.path().join("rings.json")).unwrap();
        let read_back: RingsDoc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(read_back.rings, doc.rings);
    }

    #[test]
    fn fs_store_reports_unstitched_recording_after_a_frame_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path()).unwrap();
        assert!(!store.has_unstitched_recording());
        store.write_frame_image(0, b"not really a bmp").unwrap();
        assert!(store.has_unstitched_recording());
    }

    #[test]
    fn clear_removes_prior_exposure_doc() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path()).unwrap();
        store
            .write_exposure(&ExposureDoc { exposure: vec![ExposureEntry { id: 0, e: 1.0 }] })
            .unwrap();
        store.clear().unwrap();
        assert!(!dir.path().join("exposure.json").exists());
    }

    #[test]
    fn null_store_never_reports_unstitched_work() {
        let store = NullCheckpointStore;
        store.write_frame_image(0, b"x").unwrap();
        assert!(!store.has_unstitched_recording());
    }
}
