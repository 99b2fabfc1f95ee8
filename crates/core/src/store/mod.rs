//! Course content persistence.
//!
//! Sections, subtopics, quizzes, flashcards and embeddings are the ground
//! truth the final course package is rebuilt from; the pipeline also leans
//! on these rows to skip already-completed work when a job is re-run.

mod error;
mod sqlite;
mod store;
mod types;

pub use error::StoreError;
pub use sqlite::SqliteCourseStore;
pub use store::CourseStore;
pub use types::{
    ArtifactStatus, CourseRow, EmbeddingRow, EmbeddingScope, FlashcardRow, NewEmbedding,
    NewFlashcard, NewQuiz, NewQuizQuestion, NewRoadmap, QuizQuestionRow, QuizRow, RoadmapRow,
    SectionRow, SubtopicArtifactUpdate, SubtopicRow,
};
