use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Fixed delay between consecutive external calls. Spaces out bursts
    /// against rate-limited providers; there is no adaptive backoff.
    #[serde(default = "default_inter_call_delay_ms")]
    pub inter_call_delay_ms: u64,

    /// Per-segment speech synthesis timeout.
    #[serde(default = "default_segment_timeout_secs")]
    pub segment_timeout_secs: u64,

    /// Wall-clock budget for one subtopic's narration, synthesis and
    /// combination included.
    #[serde(default = "default_subtopic_audio_timeout_secs")]
    pub subtopic_audio_timeout_secs: u64,

    /// Outer timer raced against the slide renderer, which also enforces
    /// its own timeout.
    #[serde(default = "default_outer_render_timeout_secs")]
    pub outer_render_timeout_secs: u64,

    /// Upper bound on per-section text handed to assessment prompts.
    #[serde(default = "default_assessment_excerpt_chars")]
    pub assessment_excerpt_chars: usize,

    /// Upper bound on one content chunk handed to the embedding service.
    #[serde(default = "default_embedding_excerpt_chars")]
    pub embedding_excerpt_chars: usize,

    /// Theme written into deck front matter when the model leaves it out.
    #[serde(default = "default_deck_theme")]
    pub deck_theme: String,
}

fn default_inter_call_delay_ms() -> u64 {
    750
}

fn default_segment_timeout_secs() -> u64 {
    120
}

fn default_subtopic_audio_timeout_secs() -> u64 {
    600
}

fn default_outer_render_timeout_secs() -> u64 {
    150
}

fn default_assessment_excerpt_chars() -> usize {
    4_000
}

fn default_embedding_excerpt_chars() -> usize {
    2_000
}

fn default_deck_theme() -> String {
    "default".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: default_inter_call_delay_ms(),
            segment_timeout_secs: default_segment_timeout_secs(),
            subtopic_audio_timeout_secs: default_subtopic_audio_timeout_secs(),
            outer_render_timeout_secs: default_outer_render_timeout_secs(),
            assessment_excerpt_chars: default_assessment_excerpt_chars(),
            embedding_excerpt_chars: default_embedding_excerpt_chars(),
            deck_theme: default_deck_theme(),
        }
    }
}

impl PipelineConfig {
    /// Configuration used by tests: no pacing delays.
    pub fn without_delays() -> Self {
        Self {
            inter_call_delay_ms: 0,
            ..Self::default()
        }
    }
}
