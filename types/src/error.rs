use thiserror::Error;

use crate::colorspace::Colorspace;

/// Fatal, precondition-violation errors (§7 "Input validation", "Missing
/// data file", "I/O failure", "Out-of-memory").
///
/// Algorithmic rejections (no overlap, deviation test, ring closure
/// skipped, bundle non-convergence) are *not* errors — they are values,
/// see [`crate::reject::RejectReason`] and the per-ring "skip, warn and
/// continue" paths in `panorama-recorder`/`panorama-pipeline`.
#[derive(Error, Debug)]
pub enum StitchError {
    #[error("frame has unexpected size {width}x{height}, expected {expected_width}x{expected_height}")]
    UnexpectedFrameSize {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("unsupported colorspace {0:?}")]
    UnsupportedColorspace(Colorspace),

    #[error("frame {0} has no pixel buffer loaded and no loader to fetch one")]
    PixelBufferUnavailable(u64),

    #[error("pixel buffer allocation failed after retry: {0}")]
    OutOfMemory(String),

    #[error("checkpoint file missing: {0}")]
    MissingCheckpointFile(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("recorder graph invariant violated: {0}")]
    InvalidGraph(String),

    #[error("frame {0} is not a member of any ring")]
    FrameNotRinged(u64),
}

pub type StitchResult<T> = std::result::Result<T, StitchError>;
