use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one subtopic's generated artifacts.
///
/// The status only moves forward. `AudioGenerationFailed` is a sibling of
/// `AudioGenerated`: the subtopic carries no narration but can still be
/// rendered, compiled and completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    MarkdownGenerated,
    TranscriptGenerated,
    AudioGenerated,
    AudioGenerationFailed,
    Completed,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::MarkdownGenerated => "markdown_generated",
            Self::TranscriptGenerated => "transcript_generated",
            Self::AudioGenerated => "audio_generated",
            Self::AudioGenerationFailed => "audio_generation_failed",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "markdown_generated" => Some(Self::MarkdownGenerated),
            "transcript_generated" => Some(Self::TranscriptGenerated),
            "audio_generated" => Some(Self::AudioGenerated),
            "audio_generation_failed" => Some(Self::AudioGenerationFailed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::MarkdownGenerated => 1,
            Self::TranscriptGenerated => 2,
            Self::AudioGenerated | Self::AudioGenerationFailed => 3,
            Self::Completed => 4,
        }
    }

    /// Whether moving from `self` to `next` respects the forward-only
    /// lifecycle. Same-rank transitions are rejected, so a failed audio
    /// status can never be rewritten as a success.
    pub fn advances_to(self, next: ArtifactStatus) -> bool {
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub tutor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRow {
    pub id: String,
    pub course_id: String,
    pub position: u32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtopicRow {
    pub id: String,
    pub section_id: String,
    pub position: u32,
    pub title: String,
    pub markdown_path: Option<String>,
    pub transcript_path: Option<String>,
    pub audio_path: Option<String>,
    pub video_url: Option<String>,
    pub status: ArtifactStatus,
    pub updated_at: DateTime<Utc>,
}

/// Merge-style patch for a subtopic's artifact columns. `None` fields are
/// left untouched; a status only sticks if it advances the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct SubtopicArtifactUpdate {
    pub markdown_path: Option<String>,
    pub transcript_path: Option<String>,
    pub audio_path: Option<String>,
    pub video_url: Option<String>,
    pub status: Option<ArtifactStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRow {
    pub id: String,
    pub course_id: String,
    pub section_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestionRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionRow {
    pub id: String,
    pub position: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub course_id: String,
    pub section_id: String,
    pub title: String,
    pub questions: Vec<NewQuizQuestion>,
}

#[derive(Debug, Clone)]
pub struct NewQuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardRow {
    pub id: String,
    pub course_id: String,
    pub section_id: String,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub course_id: String,
    pub section_id: String,
    pub front: String,
    pub back: String,
}

/// What a stored embedding covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingScope {
    Course,
    Section,
    Subtopic,
}

impl EmbeddingScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Section => "section",
            Self::Subtopic => "subtopic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "course" => Some(Self::Course),
            "section" => Some(Self::Section),
            "subtopic" => Some(Self::Subtopic),
            _ => None,
        }
    }
}

/// Embedding row without the vector payload; enough for dedup checks and
/// summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRow {
    pub id: String,
    pub course_id: String,
    pub scope: EmbeddingScope,
    pub ref_id: Option<String>,
    pub content_hash: String,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct NewEmbedding {
    pub course_id: String,
    pub scope: EmbeddingScope,
    pub ref_id: Option<String>,
    pub content_hash: String,
    pub vector: Vec<f32>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct RoadmapRow {
    pub id: String,
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct NewRoadmap {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub data: serde_json::Value,
}
