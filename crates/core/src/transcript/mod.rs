//! Timestamped narration transcripts.
//!
//! The text stage produces transcripts as timecoded lines; the audio stage
//! synthesizes one clip per segment and the video stage derives slide timing
//! from the same segments, which keeps narration and visuals synchronized.

mod parser;
mod types;

pub use parser::{parse_transcript, total_duration};
pub use types::TranscriptSegment;
