//! Media engine data types.

use std::path::PathBuf;

/// One synthesized narration clip and where it sits on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationClip {
    pub path: PathBuf,
    /// Seconds from the start of the subtopic narration.
    pub offset_seconds: f64,
}

impl NarrationClip {
    pub fn new(path: impl Into<PathBuf>, offset_seconds: f64) -> Self {
        Self {
            path: path.into(),
            offset_seconds,
        }
    }
}

/// One slide image and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideFrame {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

impl SlideFrame {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
        }
    }
}

/// Probe result for a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
}
