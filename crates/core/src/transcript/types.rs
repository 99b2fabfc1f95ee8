//! Transcript data types.

use serde::{Deserialize, Serialize};

/// One narration segment with its wall-clock placement in the subtopic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Seconds from the start of the subtopic narration.
    pub start_offset_seconds: f64,
    /// Seconds from the start of the subtopic narration.
    pub end_offset_seconds: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start_offset_seconds: start,
            end_offset_seconds: end,
            text: text.into(),
        }
    }

    /// Segment length in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end_offset_seconds - self.start_offset_seconds).max(0.0)
    }
}
