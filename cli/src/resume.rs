use std::collections::HashMap;
use std::fs;

use panorama_io::checkpoint::{CheckpointStore, FsCheckpointStore};
use panorama_io::codec::{ImageCodec, LibraryCodec};
use panorama_io::debug_sink::{DebugSink, FsDebugSink};
use panorama_math::rotation::{angle_between, rotation_of};
use panorama_pipeline::{CorrespondenceFinder, StereoBatch};
use panorama_types::checkpoint::{ExposureDoc, ExposureEntry, FrameRecord, RingDataDoc, RingsDoc};
use panorama_types::error::{StitchError, StitchResult};
use panorama_types::exposure::Exposure;
use panorama_types::frame::{Frame, FrameId};
use panorama_types::graph::{RecorderGraph, SelectionPoint};
use panorama_types::intrinsics::Intrinsics;
use panorama_types::selection::SelectionInfo;

use crate::config::RecorderConfig;

/// Finds the selection point whose extrinsics are nearest the stored
/// frame's original pose. A resumed frame was selected against this same
/// graph when it was first recorded, so the nearest point is always the
/// one it was matched to.
fn locate_point(graph: &RecorderGraph, frame: &Frame) -> Option<SelectionPoint> {
    let rotation = rotation_of(&frame.original_pose);
    graph
        .rings
        .iter()
        .flat_map(|ring| ring.points.iter())
        .min_by(|a, b| {
            angle_between(&rotation, &a.extrinsics)
                .partial_cmp(&angle_between(&rotation, &b.extrinsics))
                .unwrap()
        })
        .copied()
}

fn load_records(raw_dir: &std::path::Path) -> StitchResult<Vec<FrameRecord>> {
    let mut records = Vec::new();
    for entry in fs::read_dir(raw_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path)?;
        records.push(serde_json::from_slice(&bytes)?);
    }
    records.sort_by_key(|r: &FrameRecord| r.id);
    Ok(records)
}

fn frame_from_record(raw_dir: &std::path::Path, codec: &LibraryCodec, record: &FrameRecord) -> StitchResult<Frame> {
    let image_bytes = fs::read(raw_dir.join(format!("{}.bmp", record.id)))?;
    let image = codec.decode(&image_bytes, record.width, record.height)?;
    let intrinsics = Intrinsics::from_array9(record.intrinsics, record.width, record.height);
    let pose = array16_to_pose(record.original_extrinsics);
    Ok(Frame::from_loaded(image, pose, intrinsics, Exposure::default()))
}

fn array16_to_pose(a: [f64; 16]) -> panorama_types::pose::Pose {
    let mut m = panorama_types::pose::Pose::identity();
    for r in 0..4 {
        for c in 0..4 {
            m[(r, c)] = a[r * 4 + c];
        }
    }
    m
}

/// Resumes a checkpointed recording directory: reconstructs every stored
/// frame, replays it through a fresh [`CorrespondenceFinder`], writes the
/// rings/exposure checkpoint documents back out, and composites the final
/// panorama into `optograph/`.
pub async fn run(config: &RecorderConfig) -> StitchResult<()> {
    let intrinsics = config.intrinsics();
    let mut graph = panorama_recorder::generate(&intrinsics, config.mode.into());
    if config.sparsify_stride > 1 {
        graph = panorama_recorder::sparsify(&graph, config.sparsify_stride);
    }

    let checkpoint = FsCheckpointStore::new(&config.checkpoint_dir)?;
    if !checkpoint.has_unstitched_recording() {
        tracing::warn!(dir = %config.checkpoint_dir.display(), "no unstitched recording found, nothing to resume");
        return Ok(());
    }

    let raw_dir = config.checkpoint_dir.join("raw_images");
    let records = load_records(&raw_dir)?;
    let codec = LibraryCodec::bmp();

    let debug_sink: Option<FsDebugSink> = match &config.debug_dir {
        Some(dir) => Some(FsDebugSink::new(dir)?),
        None => None,
    };

    let mut finder = CorrespondenceFinder::new(config.margin, config.close_rings, config.refine_focal);
    let mut points_by_frame: HashMap<FrameId, SelectionPoint> = HashMap::new();

    for record in &records {
        let frame = frame_from_record(&raw_dir, &codec, record)?;
        let point = locate_point(&graph, &frame).ok_or(StitchError::FrameNotRinged(record.id))?;
        points_by_frame.insert(frame.id, point);
        if let Some(sink) = &debug_sink {
            let image = frame.with_pixels(|image| image.clone())?;
            sink.record_accepted_frame(frame.id, &image)?;
        }
        finder.push(&SelectionInfo {
            point,
            frame,
            angular_distance: 0.0,
            valid: true,
        })?;
    }

    let result = finder.finalize()?;
    tracing::info!(frames = result.frames.len(), rings = result.rings.len(), "finalize phase complete");

    checkpoint.write_rings(&RingsDoc { rings: result.rings.clone() })?;
    checkpoint.write_exposure(&ExposureDoc {
        exposure: result.gains.iter().map(|(&id, &e)| ExposureEntry { id, e }).collect(),
    })?;

    let frames_by_point: HashMap<u32, Frame> = result
        .frames
        .iter()
        .filter_map(|frame| points_by_frame.get(&frame.id).map(|point| (point.global_id, frame.clone())))
        .collect();

    let (image, mask) = StereoBatch::stitch(&graph, &frames_by_point, intrinsics, config.use_flow)?;
    let image_bytes = codec.encode(&image)?;
    let mask_codec = LibraryCodec::bmp();
    let mask_rgb = image::DynamicImage::ImageLuma8(mask.clone()).to_rgb8();
    let mask_bytes = mask_codec.encode(&mask_rgb)?;
    checkpoint.write_optograph(
        &image_bytes,
        &mask_bytes,
        &RingDataDoc {
            x: 0,
            y: 0,
            id: 0,
            seamed: true,
            width: image.width(),
            height: image.height(),
        },
    )?;

    tracing::info!(width = image.width(), height = image.height(), "wrote composited panorama to optograph/");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn pose_to_array16(pose: panorama_types::pose::Pose) -> [f64; 16] {
        let mut out = [0.0; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = pose[(r, c)];
            }
        }
        out
    }

    fn test_config(checkpoint_dir: std::path::PathBuf) -> RecorderConfig {
        RecorderConfig {
            checkpoint_dir,
            debug_dir: None,
            mode: crate::config::ModeArg::CenterOnly,
            sparsify_stride: 1,
            fx: 180.0,
            fy: 180.0,
            cx: 100.0,
            cy: 75.0,
            width: 200,
            height: 150,
            tolerance_x: 0.3,
            tolerance_y: 0.3,
            tolerance_z: 0.3,
            margin: 8.0,
            close_rings: false,
            refine_focal: false,
            use_flow: false,
            queue_capacity: 4,
            log_level: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn resuming_over_a_single_checkpointed_frame_writes_an_optograph() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let intrinsics = config.intrinsics();
        let graph = panorama_recorder::generate(&intrinsics, config.mode.into());
        let point = graph.rings[0].points[0];

        let mut image = image::RgbImage::new(intrinsics.width, intrinsics.height);
        for y in 0..intrinsics.height {
            for x in 0..intrinsics.width {
                let v = (((x * 3 + y * 5) % 250) as u8) + 5;
                image.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        let pose = panorama_math::rotation::to_4x4(point.extrinsics);
        let record = FrameRecord {
            id: 0,
            width: intrinsics.width,
            height: intrinsics.height,
            intrinsics: intrinsics.to_array9(),
            adjusted_extrinsics: pose_to_array16(pose),
            original_extrinsics: pose_to_array16(pose),
        };

        let store = FsCheckpointStore::new(dir.path()).unwrap();
        let codec = LibraryCodec::bmp();
        store.write_frame_image(0, &codec.encode(&image).unwrap()).unwrap();
        store.write_frame_record(0, &record).unwrap();

        run(&config).await.unwrap();

        assert!(dir.path().join("optograph/result.bmp").exists());
        assert!(dir.path().join("rings.json").exists());
    }

    #[test]
    fn array16_roundtrips_through_pose() {
        let pose = panorama_math::rotation::to_4x4(panorama_math::rotation::rotation_y(0.42));
        let restored = array16_to_pose(pose_to_array16(pose));
        assert_eq!(restored, pose);
    }
}
