//! Media engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the ffmpeg-backed media engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Path to the ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for audio mixing/concatenation, in seconds.
    #[serde(default = "default_mix_timeout")]
    pub mix_timeout_secs: u64,

    /// Timeout for video encoding, in seconds.
    #[serde(default = "default_encode_timeout")]
    pub encode_timeout_secs: u64,

    /// Integrated loudness target for narration, in LUFS.
    #[serde(default = "default_loudness_target")]
    pub loudness_target_lufs: f32,

    /// True-peak ceiling for narration, in dBTP.
    #[serde(default = "default_true_peak")]
    pub loudness_true_peak: f32,

    /// Output frame rate for compiled videos.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Output pixel format; yuv420p plays everywhere.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Video codec for compiled videos.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio codec for compiled videos.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate for compiled videos.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Placeholder slide resolution, `WxH`.
    #[serde(default = "default_placeholder_size")]
    pub placeholder_size: String,

    /// Placeholder slide background color (ffmpeg color syntax).
    #[serde(default = "default_placeholder_background")]
    pub placeholder_background: String,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_mix_timeout() -> u64 {
    120
}

fn default_encode_timeout() -> u64 {
    300
}

fn default_loudness_target() -> f32 {
    -16.0
}

fn default_true_peak() -> f32 {
    -1.5
}

fn default_fps() -> u32 {
    30
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_placeholder_size() -> String {
    "1280x720".to_string()
}

fn default_placeholder_background() -> String {
    "0x1f2430".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            mix_timeout_secs: default_mix_timeout(),
            encode_timeout_secs: default_encode_timeout(),
            loudness_target_lufs: default_loudness_target(),
            loudness_true_peak: default_true_peak(),
            fps: default_fps(),
            pixel_format: default_pixel_format(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            placeholder_size: default_placeholder_size(),
            placeholder_background: default_placeholder_background(),
        }
    }
}

impl MediaConfig {
    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets the encode timeout.
    pub fn with_encode_timeout(mut self, secs: u64) -> Self {
        self.encode_timeout_secs = secs;
        self
    }
}
