//! Audio/video processing via external tools.
//!
//! Everything that touches ffmpeg/ffprobe lives here: probing durations,
//! time-aligned narration mixing with loudness normalization, the naive
//! concat fallback, slideshow encoding, and placeholder rasterization.
//! Stages depend on the [`MediaEngine`] trait so tests can swap in a mock
//! without spawning processes.

mod config;
mod engine;
mod error;
mod ffmpeg;
mod types;

pub use config::MediaConfig;
pub use engine::MediaEngine;
pub use error::MediaError;
pub use ffmpeg::FfmpegEngine;
pub use types::{MediaInfo, NarrationClip, SlideFrame};
