//! Course generation pipeline.
//!
//! [`CoursePipeline`] turns a roadmap (sections and subtopics) into a
//! fully produced course: slide decks, narration transcripts and audio,
//! compiled videos, published URLs, quizzes, flashcards, and search
//! embeddings. Stages run strictly in that order and report into fixed
//! progress windows; unit-level failures degrade the output while the
//! job keeps moving.

mod config;
mod error;
mod prompts;
mod runner;
mod stages;
mod timing;
mod types;
mod workspace;

pub use config::PipelineConfig;
pub use error::{PipelineError, Severity, StageError};
pub use runner::CoursePipeline;
pub use stages::{SectionPlan, StageContext};
pub use timing::plan_slide_durations;
pub use types::{
    CoursePackage, FlashcardPayload, GenerationSummary, QuizPayload, QuizQuestionPayload,
    SectionPackage,
};
pub use workspace::{slugify, SubtopicPaths, WorkspaceLayout};
