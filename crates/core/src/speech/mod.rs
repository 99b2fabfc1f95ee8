//! Speech-synthesis service clients.
//!
//! Narration clips are synthesized one transcript segment at a time. Speech
//! calls are never retried: a failed segment is logged and skipped so a
//! flaky voice service cannot stall the whole subtopic.

mod elevenlabs;
mod types;

pub use elevenlabs::ElevenLabsClient;
pub use types::{SpeechClient, SpeechError};
