use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use panorama_types::intrinsics::Intrinsics;
use panorama_types::mode::RecorderMode;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resumes a checkpointed recording: reconstructs every stored frame,
    /// re-runs the correspondence finder's finalize phase, and composites
    /// the final panorama.
    Resume(RecorderConfig),
}

/// Mirrors [`RecorderMode`] for clap's benefit, since the domain type
/// intentionally carries no CLI dependency.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    FullSphere,
    CenterOnly,
    Truncated,
    NoBottom,
}

impl From<ModeArg> for RecorderMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::FullSphere => RecorderMode::FullSphere,
            ModeArg::CenterOnly => RecorderMode::CenterOnly,
            ModeArg::Truncated => RecorderMode::Truncated,
            ModeArg::NoBottom => RecorderMode::NoBottom,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RecorderConfig {
    /// Directory holding `raw_images/`, `rings.json`, etc.
    #[arg(long)]
    pub checkpoint_dir: PathBuf,

    /// Directory JPEGs of accepted keyframes are written to; omit to
    /// disable the debug sink.
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::CenterOnly)]
    pub mode: ModeArg,

    /// Keeps every `stride`-th selection point per ring.
    #[arg(long, default_value_t = 1)]
    pub sparsify_stride: u32,

    #[arg(long, default_value_t = 1000.0)]
    pub fx: f64,
    #[arg(long, default_value_t = 1000.0)]
    pub fy: f64,
    #[arg(long, default_value_t = 960.0)]
    pub cx: f64,
    #[arg(long, default_value_t = 540.0)]
    pub cy: f64,
    #[arg(long, default_value_t = 1920)]
    pub width: u32,
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Per-axis selector rotation tolerance, radians.
    #[arg(long, default_value_t = 0.12)]
    pub tolerance_x: f64,
    #[arg(long, default_value_t = 0.12)]
    pub tolerance_y: f64,
    #[arg(long, default_value_t = 0.12)]
    pub tolerance_z: f64,

    /// Pixel margin the planar correlator searches around the nominal
    /// overlap window.
    #[arg(long, default_value_t = 24.0)]
    pub margin: f64,

    /// Runs ring closure before the global alignment solve.
    #[arg(long, default_value_t = true)]
    pub close_rings: bool,

    /// Runs the optional per-ring focal-length drift refinement.
    #[arg(long, default_value_t = false)]
    pub refine_focal: bool,

    /// Uses optical-flow-corrected feather blending instead of the
    /// zero-flow fallback.
    #[arg(long, default_value_t = true)]
    pub use_flow: bool,

    /// Bounded capacity of the correspondence-finder's inbound queue.
    #[arg(long, default_value_t = panorama_pipeline::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    #[arg(long, default_value_t = String::from("info"))]
    pub log_level: String,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModeArg::FullSphere => "full-sphere",
            ModeArg::CenterOnly => "center-only",
            ModeArg::Truncated => "truncated",
            ModeArg::NoBottom => "no-bottom",
        };
        f.write_str(name)
    }
}

impl RecorderConfig {
    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics::new(self.fx, self.fy, self.cx, self.cy, self.width, self.height)
    }

    pub fn tolerance(&self) -> panorama_recorder::Tolerance {
        panorama_recorder::Tolerance {
            x: self.tolerance_x,
            y: self.tolerance_y,
            z: self.tolerance_z,
        }
    }
}
