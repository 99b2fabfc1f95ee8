//! Media engine trait.

use async_trait::async_trait;
use std::path::Path;

use super::error::MediaError;
use super::types::{MediaInfo, NarrationClip, SlideFrame};

/// External media tooling behind one seam.
///
/// The production implementation shells out to ffmpeg/ffprobe; tests use a
/// mock that fabricates outputs on disk.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Probe a media file for its duration.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;

    /// Mix narration clips onto one track: each clip delayed to its
    /// transcript offset, all tracks mixed, loudness normalized.
    async fn mix_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError>;

    /// Fallback combination: clips concatenated back to back, ignoring
    /// transcript offsets.
    async fn concat_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError>;

    /// Encode slide frames (each with an on-screen duration) plus optional
    /// narration into one video file.
    async fn compile_slideshow(
        &self,
        frames: &[SlideFrame],
        narration: Option<&Path>,
        output: &Path,
    ) -> Result<(), MediaError>;

    /// Rasterize a single placeholder slide with the given caption.
    async fn render_placeholder(&self, caption: &str, output: &Path) -> Result<(), MediaError>;
}
