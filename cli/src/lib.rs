pub mod config;
pub mod resume;

pub use config::{Cli, Commands, ModeArg, RecorderConfig};
