use super::error::StoreError;
use super::types::{
    CourseRow, EmbeddingRow, FlashcardRow, NewEmbedding, NewFlashcard, NewQuiz, NewRoadmap,
    QuizRow, RoadmapRow, SectionRow, SubtopicArtifactUpdate, SubtopicRow,
};

/// Persistence for course structure and generated content.
///
/// The `ensure_*` methods are idempotent: they return the existing row when
/// one is already keyed the same way, which is what lets a re-run skip work
/// a previous attempt already finished.
pub trait CourseStore: Send + Sync {
    /// Fetch the course with `id` if it exists, otherwise create it (with
    /// the given id when supplied, a fresh one when not).
    fn ensure_course(
        &self,
        id: Option<&str>,
        title: &str,
        tutor_id: Option<&str>,
    ) -> Result<CourseRow, StoreError>;

    fn get_course(&self, id: &str) -> Result<Option<CourseRow>, StoreError>;

    fn ensure_section(
        &self,
        course_id: &str,
        position: u32,
        title: &str,
    ) -> Result<SectionRow, StoreError>;

    fn list_sections(&self, course_id: &str) -> Result<Vec<SectionRow>, StoreError>;

    fn ensure_subtopic(
        &self,
        section_id: &str,
        position: u32,
        title: &str,
    ) -> Result<SubtopicRow, StoreError>;

    fn list_subtopics(&self, section_id: &str) -> Result<Vec<SubtopicRow>, StoreError>;

    /// Merge artifact fields into a subtopic row. The status is only
    /// written when it advances the lifecycle.
    fn update_subtopic_artifacts(
        &self,
        subtopic_id: &str,
        update: &SubtopicArtifactUpdate,
    ) -> Result<SubtopicRow, StoreError>;

    fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizRow, StoreError>;

    fn list_quizzes(&self, course_id: &str) -> Result<Vec<QuizRow>, StoreError>;

    fn insert_flashcard(&self, flashcard: NewFlashcard) -> Result<FlashcardRow, StoreError>;

    fn list_flashcards(&self, course_id: &str) -> Result<Vec<FlashcardRow>, StoreError>;

    fn embedding_exists(&self, content_hash: &str) -> Result<bool, StoreError>;

    /// Insert an embedding unless its content hash is already stored.
    /// Returns whether a row was written.
    fn try_insert_embedding(&self, embedding: NewEmbedding) -> Result<bool, StoreError>;

    fn list_embeddings(&self, course_id: &str) -> Result<Vec<EmbeddingRow>, StoreError>;

    fn insert_roadmap(&self, roadmap: NewRoadmap) -> Result<RoadmapRow, StoreError>;

    fn get_roadmap(&self, id: &str) -> Result<Option<RoadmapRow>, StoreError>;
}
