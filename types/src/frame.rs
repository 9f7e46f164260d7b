use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use image::RgbImage;

use crate::colorspace::Colorspace;
use crate::error::{StitchError, StitchResult};
use crate::exposure::Exposure;
use crate::intrinsics::Intrinsics;
use crate::pose::Pose;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(0);

/// Monotonically unique frame identifier (§3: "monotonically unique
/// identifier").
pub type FrameId = u64;

pub fn next_frame_id() -> FrameId {
    NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed)
}

/// A handle to raw pixel data that hasn't been decoded/converted yet —
/// the `dataRef` of §6 ("raw pointer, width, height, colorspace").
/// `PixelLoader::load` performs the RGBA->BGR conversion, the
/// portrait transpose+flip, and the size precondition check, returning a
/// working-resolution [`RgbImage`].
pub trait PixelLoader: fmt::Debug + Send + Sync {
    fn load(&self) -> StitchResult<RgbImage>;
}

#[derive(Debug)]
enum PixelState {
    /// `loader` is `None` for buffers constructed already-decoded
    /// ([`Frame::from_loaded`]); those can never be unloaded, since there
    /// is nothing to reload them from.
    Loaded {
        image: RgbImage,
        loader: Option<Arc<dyn PixelLoader>>,
    },
    Unloaded(Arc<dyn PixelLoader>),
}

/// A captured frame: pixel buffer (lazily loaded/unloadable), original and
/// adjusted poses, intrinsics, exposure, identity, and (once selected)
/// ring placement (§3).
///
/// Cloning a `Frame` is cheap — pixel storage, and original pose, are
/// shared (`Arc`); the adjusted pose is the only field mutated in place
/// after construction, and only by the correspondence finder's finish
/// phase (§3 lifecycle).
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pixels: Arc<RwLock<PixelState>>,
    pub original_pose: Pose,
    adjusted_pose: Arc<RwLock<Pose>>,
    pub intrinsics: Arc<RwLock<Intrinsics>>,
    pub exposure: Exposure,
    pub ring_id: Option<u32>,
    pub local_id: Option<u32>,
}

impl Frame {
    /// Constructs a frame from an already-decoded buffer. `original` and
    /// `adjusted` pose start out equal (§3 lifecycle: "created on capture
    /// with original==adjusted").
    pub fn from_loaded(
        pixels: RgbImage,
        pose: Pose,
        intrinsics: Intrinsics,
        exposure: Exposure,
    ) -> Self {
        Self {
            id: next_frame_id(),
            pixels: Arc::new(RwLock::new(PixelState::Loaded {
                image: pixels,
                loader: None,
            })),
            original_pose: pose,
            adjusted_pose: Arc::new(RwLock::new(pose)),
            intrinsics: Arc::new(RwLock::new(intrinsics)),
            exposure,
            ring_id: None,
            local_id: None,
        }
    }

    /// Constructs a frame with a lazy pixel loader; the buffer is not
    /// decoded until [`Frame::load`] is called.
    pub fn from_loader(
        loader: Arc<dyn PixelLoader>,
        pose: Pose,
        intrinsics: Intrinsics,
        exposure: Exposure,
    ) -> Self {
        Self {
            id: next_frame_id(),
            pixels: Arc::new(RwLock::new(PixelState::Unloaded(loader))),
            original_pose: pose,
            adjusted_pose: Arc::new(RwLock::new(pose)),
            intrinsics: Arc::new(RwLock::new(intrinsics)),
            exposure,
            ring_id: None,
            local_id: None,
        }
    }

    pub fn adjusted_pose(&self) -> Pose {
        *self.adjusted_pose.read().expect("adjusted_pose lock poisoned")
    }

    /// Mutates the adjusted pose. Per §3 this is only ever called by the
    /// correspondence finder's finish phase (alignment solve + ring
    /// closure application).
    pub fn set_adjusted_pose(&self, pose: Pose) {
        *self.adjusted_pose.write().expect("adjusted_pose lock poisoned") = pose;
    }

    pub fn intrinsics(&self) -> Intrinsics {
        *self.intrinsics.read().expect("intrinsics lock poisoned")
    }

    pub fn set_intrinsics(&self, intrinsics: Intrinsics) {
        *self.intrinsics.write().expect("intrinsics lock poisoned") = intrinsics;
    }

    /// Copies the adjusted pose onto the original pose, as the finish
    /// phase does once the global alignment solve is applied (§4.7 step
    /// 3: "apply x[i]... and copy it to the original pose for downstream
    /// stitchers").
    pub fn commit_adjusted_to_original(&mut self) {
        self.original_pose = self.adjusted_pose();
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            *self.pixels.read().expect("pixels lock poisoned"),
            PixelState::Loaded { .. }
        )
    }

    /// Loads the pixel buffer if needed, returning `true` if this call
    /// performed the load (for `AutoLoad` scope bookkeeping, §5).
    pub fn load(&self) -> StitchResult<bool> {
        let mut guard = self.pixels.write().expect("pixels lock poisoned");
        match &*guard {
            PixelState::Loaded { .. } => Ok(false),
            PixelState::Unloaded(loader) => {
                let loader = loader.clone();
                let image = loader.load()?;
                *guard = PixelState::Loaded {
                    image,
                    loader: Some(loader),
                };
                Ok(true)
            }
        }
    }

    /// Explicitly unloads the pixel buffer to conserve memory (§3); a
    /// no-op if there's no loader to reconstruct it from later.
    pub fn unload(&self) {
        let mut guard = self.pixels.write().expect("pixels lock poisoned");
        if let PixelState::Loaded {
            loader: Some(loader),
            ..
        } = &*guard
        {
            let loader = loader.clone();
            *guard = PixelState::Unloaded(loader);
        }
    }

    pub fn with_pixels<T>(&self, f: impl FnOnce(&RgbImage) -> T) -> StitchResult<T> {
        self.load()?;
        let guard = self.pixels.read().expect("pixels lock poisoned");
        match &*guard {
            PixelState::Loaded { image, .. } => Ok(f(image)),
            PixelState::Unloaded(_) => Err(StitchError::PixelBufferUnavailable(self.id)),
        }
    }
}

/// Validates and normalizes an incoming raw frame per §6: rejects
/// unexpected sizes, converts `RGBA` to 3-channel `RGB`/`BGR`, and
/// transposes+flips portrait captures into the working landscape layout.
pub fn normalize_incoming(
    data: &[u8],
    width: u32,
    height: u32,
    colorspace: Colorspace,
    expected_width: u32,
    expected_height: u32,
    portrait: bool,
) -> StitchResult<RgbImage> {
    let (logical_w, logical_h) = if portrait {
        (height, width)
    } else {
        (width, height)
    };
    if logical_w != expected_width || logical_h != expected_height {
        return Err(StitchError::UnexpectedFrameSize {
            width: logical_w,
            height: logical_h,
            expected_width,
            expected_height,
        });
    }

    let rgb_pixels: Vec<u8> = match colorspace {
        Colorspace::Rgb => data.to_vec(),
        Colorspace::Rgba => data
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        Colorspace::Bgra => data
            .chunks_exact(4)
            .flat_map(|p| [p[2], p[1], p[0]])
            .collect(),
    };

    let image = RgbImage::from_raw(width, height, rgb_pixels)
        .ok_or(StitchError::UnexpectedFrameSize {
            width,
            height,
            expected_width,
            expected_height,
        })?;

    Ok(if portrait {
        image::imageops::flip_vertical(&image::imageops::rotate90(&image))
    } else {
        image
    })
}
