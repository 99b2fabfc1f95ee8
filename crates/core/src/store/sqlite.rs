//! SQLite-backed course store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::error::StoreError;
use super::store::CourseStore;
use super::types::{
    ArtifactStatus, CourseRow, EmbeddingRow, EmbeddingScope, FlashcardRow, NewEmbedding,
    NewFlashcard, NewQuiz, NewRoadmap, QuizQuestionRow, QuizRow, RoadmapRow, SectionRow,
    SubtopicArtifactUpdate, SubtopicRow,
};

pub struct SqliteCourseStore {
    conn: Mutex<Connection>,
}

impl SqliteCourseStore {
    /// Open (creating if needed) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                tutor_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sections (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(course_id, position)
            );

            CREATE TABLE IF NOT EXISTS subtopics (
                id TEXT PRIMARY KEY,
                section_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                markdown_path TEXT,
                transcript_path TEXT,
                audio_path TEXT,
                video_url TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(section_id, position)
            );

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                section_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS quiz_questions (
                id TEXT PRIMARY KEY,
                quiz_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_index INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                section_id TEXT NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS embeddings (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                scope TEXT NOT NULL,
                ref_id TEXT,
                content_hash TEXT NOT NULL UNIQUE,
                vector TEXT NOT NULL,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roadmaps (
                id TEXT PRIMARY KEY,
                course_id TEXT,
                title TEXT,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sections_course ON sections(course_id);
            CREATE INDEX IF NOT EXISTS idx_subtopics_section ON subtopics(section_id);
            CREATE INDEX IF NOT EXISTS idx_quizzes_course ON quizzes(course_id);
            CREATE INDEX IF NOT EXISTS idx_quiz_questions_quiz ON quiz_questions(quiz_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_course ON flashcards(course_id);
            CREATE INDEX IF NOT EXISTS idx_embeddings_course ON embeddings(course_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_course(row: &rusqlite::Row) -> rusqlite::Result<CourseRow> {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let tutor_id: Option<String> = row.get(2)?;
        let created_at_str: String = row.get(3)?;
        Ok(CourseRow {
            id,
            title,
            tutor_id,
            created_at: parse_timestamp(&created_at_str),
        })
    }

    fn row_to_section(row: &rusqlite::Row) -> rusqlite::Result<SectionRow> {
        Ok(SectionRow {
            id: row.get(0)?,
            course_id: row.get(1)?,
            position: row.get(2)?,
            title: row.get(3)?,
        })
    }

    fn row_to_subtopic(row: &rusqlite::Row) -> rusqlite::Result<SubtopicRow> {
        let status_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;
        Ok(SubtopicRow {
            id: row.get(0)?,
            section_id: row.get(1)?,
            position: row.get(2)?,
            title: row.get(3)?,
            markdown_path: row.get(4)?,
            transcript_path: row.get(5)?,
            audio_path: row.get(6)?,
            video_url: row.get(7)?,
            status: ArtifactStatus::parse(&status_str).unwrap_or(ArtifactStatus::Pending),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn get_subtopic_locked(
        conn: &Connection,
        subtopic_id: &str,
    ) -> Result<SubtopicRow, StoreError> {
        let result = conn.query_row(
            "SELECT id, section_id, position, title, markdown_path, transcript_path, audio_path, video_url, status, updated_at FROM subtopics WHERE id = ?",
            params![subtopic_id],
            Self::row_to_subtopic,
        );
        match result {
            Ok(row) => Ok(row),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StoreError::NotFound(format!("subtopic {}", subtopic_id)))
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn quiz_questions_locked(
        conn: &Connection,
        quiz_id: &str,
    ) -> Result<Vec<QuizQuestionRow>, StoreError> {
        let mut stmt = conn
            .prepare(
                "SELECT id, position, question, options, correct_index FROM quiz_questions WHERE quiz_id = ? ORDER BY position ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![quiz_id], |row| {
                let options_json: String = row.get(3)?;
                Ok(QuizQuestionRow {
                    id: row.get(0)?,
                    position: row.get(1)?,
                    question: row.get(2)?,
                    options: serde_json::from_str(&options_json).unwrap_or_default(),
                    correct_index: row.get(4)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(questions)
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl CourseStore for SqliteCourseStore {
    fn ensure_course(
        &self,
        id: Option<&str>,
        title: &str,
        tutor_id: Option<&str>,
    ) -> Result<CourseRow, StoreError> {
        let conn = self.conn.lock().unwrap();

        if let Some(id) = id {
            let existing = conn
                .query_row(
                    "SELECT id, title, tutor_id, created_at FROM courses WHERE id = ?",
                    params![id],
                    Self::row_to_course,
                )
                .optional()
                .map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(course) = existing {
                return Ok(course);
            }
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now();
        conn.execute(
            "INSERT INTO courses (id, title, tutor_id, created_at) VALUES (?, ?, ?, ?)",
            params![id, title, tutor_id, now.to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(CourseRow {
            id,
            title: title.to_string(),
            tutor_id: tutor_id.map(str::to_string),
            created_at: now,
        })
    }

    fn get_course(&self, id: &str) -> Result<Option<CourseRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, tutor_id, created_at FROM courses WHERE id = ?",
            params![id],
            Self::row_to_course,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn ensure_section(
        &self,
        course_id: &str,
        position: u32,
        title: &str,
    ) -> Result<SectionRow, StoreError> {
        let conn = self.conn.lock().unwrap();

        let existing = conn
            .query_row(
                "SELECT id, course_id, position, title FROM sections WHERE course_id = ? AND position = ?",
                params![course_id, position],
                Self::row_to_section,
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if let Some(section) = existing {
            return Ok(section);
        }

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sections (id, course_id, position, title, created_at) VALUES (?, ?, ?, ?, ?)",
            params![id, course_id, position, title, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(SectionRow {
            id,
            course_id: course_id.to_string(),
            position,
            title: title.to_string(),
        })
    }

    fn list_sections(&self, course_id: &str) -> Result<Vec<SectionRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, course_id, position, title FROM sections WHERE course_id = ? ORDER BY position ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![course_id], Self::row_to_section)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut sections = Vec::new();
        for row in rows {
            sections.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(sections)
    }

    fn ensure_subtopic(
        &self,
        section_id: &str,
        position: u32,
        title: &str,
    ) -> Result<SubtopicRow, StoreError> {
        let conn = self.conn.lock().unwrap();

        let existing = conn
            .query_row(
                "SELECT id, section_id, position, title, markdown_path, transcript_path, audio_path, video_url, status, updated_at FROM subtopics WHERE section_id = ? AND position = ?",
                params![section_id, position],
                Self::row_to_subtopic,
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if let Some(subtopic) = existing {
            return Ok(subtopic);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO subtopics (id, section_id, position, title, status, created_at, updated_at) VALUES (?, ?, ?, ?, 'pending', ?, ?)",
            params![id, section_id, position, title, now.to_rfc3339(), now.to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(SubtopicRow {
            id,
            section_id: section_id.to_string(),
            position,
            title: title.to_string(),
            markdown_path: None,
            transcript_path: None,
            audio_path: None,
            video_url: None,
            status: ArtifactStatus::Pending,
            updated_at: now,
        })
    }

    fn list_subtopics(&self, section_id: &str) -> Result<Vec<SubtopicRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, section_id, position, title, markdown_path, transcript_path, audio_path, video_url, status, updated_at FROM subtopics WHERE section_id = ? ORDER BY position ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![section_id], Self::row_to_subtopic)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut subtopics = Vec::new();
        for row in rows {
            subtopics.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(subtopics)
    }

    fn update_subtopic_artifacts(
        &self,
        subtopic_id: &str,
        update: &SubtopicArtifactUpdate,
    ) -> Result<SubtopicRow, StoreError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::get_subtopic_locked(&conn, subtopic_id)?;

        let status = match update.status {
            Some(next) if current.status.advances_to(next) => next,
            _ => current.status,
        };

        let merged = SubtopicRow {
            markdown_path: update.markdown_path.clone().or(current.markdown_path),
            transcript_path: update.transcript_path.clone().or(current.transcript_path),
            audio_path: update.audio_path.clone().or(current.audio_path),
            video_url: update.video_url.clone().or(current.video_url),
            status,
            updated_at: Utc::now(),
            ..current
        };

        conn.execute(
            "UPDATE subtopics SET markdown_path = ?, transcript_path = ?, audio_path = ?, video_url = ?, status = ?, updated_at = ? WHERE id = ?",
            params![
                merged.markdown_path,
                merged.transcript_path,
                merged.audio_path,
                merged.video_url,
                merged.status.as_str(),
                merged.updated_at.to_rfc3339(),
                subtopic_id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(merged)
    }

    fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizRow, StoreError> {
        let conn = self.conn.lock().unwrap();

        let quiz_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO quizzes (id, course_id, section_id, title, created_at) VALUES (?, ?, ?, ?, ?)",
            params![quiz_id, quiz.course_id, quiz.section_id, quiz.title, now],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for (position, question) in quiz.questions.into_iter().enumerate() {
            let question_id = uuid::Uuid::new_v4().to_string();
            let options_json = serde_json::to_string(&question.options)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            conn.execute(
                "INSERT INTO quiz_questions (id, quiz_id, position, question, options, correct_index) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    question_id,
                    quiz_id,
                    position as u32,
                    question.question,
                    options_json,
                    question.correct_index,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

            questions.push(QuizQuestionRow {
                id: question_id,
                position: position as u32,
                question: question.question,
                options: question.options,
                correct_index: question.correct_index,
            });
        }

        Ok(QuizRow {
            id: quiz_id,
            course_id: quiz.course_id,
            section_id: quiz.section_id,
            title: quiz.title,
            questions,
        })
    }

    fn list_quizzes(&self, course_id: &str) -> Result<Vec<QuizRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, course_id, section_id, title FROM quizzes WHERE course_id = ? ORDER BY created_at ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![course_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut headers = Vec::new();
        for row in rows {
            headers.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        let mut quizzes = Vec::with_capacity(headers.len());
        for (id, course_id, section_id, title) in headers {
            let questions = Self::quiz_questions_locked(&conn, &id)?;
            quizzes.push(QuizRow {
                id,
                course_id,
                section_id,
                title,
                questions,
            });
        }
        Ok(quizzes)
    }

    fn insert_flashcard(&self, flashcard: NewFlashcard) -> Result<FlashcardRow, StoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO flashcards (id, course_id, section_id, front, back, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                flashcard.course_id,
                flashcard.section_id,
                flashcard.front,
                flashcard.back,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(FlashcardRow {
            id,
            course_id: flashcard.course_id,
            section_id: flashcard.section_id,
            front: flashcard.front,
            back: flashcard.back,
        })
    }

    fn list_flashcards(&self, course_id: &str) -> Result<Vec<FlashcardRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, course_id, section_id, front, back FROM flashcards WHERE course_id = ? ORDER BY created_at ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![course_id], |row| {
                Ok(FlashcardRow {
                    id: row.get(0)?,
                    course_id: row.get(1)?,
                    section_id: row.get(2)?,
                    front: row.get(3)?,
                    back: row.get(4)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut flashcards = Vec::new();
        for row in rows {
            flashcards.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(flashcards)
    }

    fn embedding_exists(&self, content_hash: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM embeddings WHERE content_hash = ?",
                params![content_hash],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    fn try_insert_embedding(&self, embedding: NewEmbedding) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let vector_json = serde_json::to_string(&embedding.vector)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO embeddings (id, course_id, scope, ref_id, content_hash, vector, model, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    embedding.course_id,
                    embedding.scope.as_str(),
                    embedding.ref_id,
                    embedding.content_hash,
                    vector_json,
                    embedding.model,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    fn list_embeddings(&self, course_id: &str) -> Result<Vec<EmbeddingRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, course_id, scope, ref_id, content_hash, model, vector FROM embeddings WHERE course_id = ? ORDER BY created_at ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![course_id], |row| {
                let scope_str: String = row.get(2)?;
                let vector_json: String = row.get(6)?;
                let dimensions = serde_json::from_str::<Vec<f32>>(&vector_json)
                    .map(|v| v.len())
                    .unwrap_or(0);
                Ok(EmbeddingRow {
                    id: row.get(0)?,
                    course_id: row.get(1)?,
                    scope: EmbeddingScope::parse(&scope_str).unwrap_or(EmbeddingScope::Course),
                    ref_id: row.get(3)?,
                    content_hash: row.get(4)?,
                    model: row.get(5)?,
                    dimensions,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut embeddings = Vec::new();
        for row in rows {
            embeddings.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(embeddings)
    }

    fn insert_roadmap(&self, roadmap: NewRoadmap) -> Result<RoadmapRow, StoreError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let data_json = serde_json::to_string(&roadmap.data)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO roadmaps (id, course_id, title, data, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                roadmap.course_id,
                roadmap.title,
                data_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(RoadmapRow {
            id,
            course_id: roadmap.course_id,
            title: roadmap.title,
            data: roadmap.data,
        })
    }

    fn get_roadmap(&self, id: &str) -> Result<Option<RoadmapRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, course_id, title, data FROM roadmaps WHERE id = ?",
            params![id],
            |row| {
                let data_json: String = row.get(3)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    data_json,
                ))
            },
        );

        match result {
            Ok((id, course_id, title, data_json)) => {
                let data = serde_json::from_str(&data_json)
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(Some(RoadmapRow {
                    id,
                    course_id,
                    title,
                    data,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewQuizQuestion;

    fn create_test_store() -> SqliteCourseStore {
        SqliteCourseStore::in_memory().unwrap()
    }

    #[test]
    fn test_ensure_course_creates_and_reuses() {
        let store = create_test_store();

        let created = store
            .ensure_course(Some("course-1"), "Rust Basics", Some("tutor-1"))
            .unwrap();
        assert_eq!(created.id, "course-1");
        assert_eq!(created.tutor_id.as_deref(), Some("tutor-1"));

        // Second call with a different title must return the stored row.
        let reused = store
            .ensure_course(Some("course-1"), "Something Else", None)
            .unwrap();
        assert_eq!(reused.title, "Rust Basics");
    }

    #[test]
    fn test_ensure_course_generates_id() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Untitled", None).unwrap();
        assert!(!course.id.is_empty());
        assert!(store.get_course(&course.id).unwrap().is_some());
    }

    #[test]
    fn test_ensure_section_idempotent() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();

        let first = store.ensure_section(&course.id, 0, "Intro").unwrap();
        let second = store.ensure_section(&course.id, 0, "Intro").unwrap();
        assert_eq!(first.id, second.id);

        let sections = store.list_sections(&course.id).unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_sections_ordered_by_position() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();
        store.ensure_section(&course.id, 2, "Third").unwrap();
        store.ensure_section(&course.id, 0, "First").unwrap();
        store.ensure_section(&course.id, 1, "Second").unwrap();

        let titles: Vec<_> = store
            .list_sections(&course.id)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_update_subtopic_artifacts_merges() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();
        let section = store.ensure_section(&course.id, 0, "Intro").unwrap();
        let subtopic = store.ensure_subtopic(&section.id, 0, "What is X").unwrap();

        store
            .update_subtopic_artifacts(
                &subtopic.id,
                &SubtopicArtifactUpdate {
                    markdown_path: Some("/w/deck.md".to_string()),
                    status: Some(ArtifactStatus::MarkdownGenerated),
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = store
            .update_subtopic_artifacts(
                &subtopic.id,
                &SubtopicArtifactUpdate {
                    audio_path: Some("/w/narration.mp3".to_string()),
                    status: Some(ArtifactStatus::AudioGenerated),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.markdown_path.as_deref(), Some("/w/deck.md"));
        assert_eq!(updated.audio_path.as_deref(), Some("/w/narration.mp3"));
        assert_eq!(updated.status, ArtifactStatus::AudioGenerated);
    }

    #[test]
    fn test_update_subtopic_status_never_regresses() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();
        let section = store.ensure_section(&course.id, 0, "Intro").unwrap();
        let subtopic = store.ensure_subtopic(&section.id, 0, "What is X").unwrap();

        store
            .update_subtopic_artifacts(
                &subtopic.id,
                &SubtopicArtifactUpdate {
                    status: Some(ArtifactStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();

        let after = store
            .update_subtopic_artifacts(
                &subtopic.id,
                &SubtopicArtifactUpdate {
                    status: Some(ArtifactStatus::Pending),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(after.status, ArtifactStatus::Completed);
    }

    #[test]
    fn test_update_missing_subtopic_is_not_found() {
        let store = create_test_store();
        let result =
            store.update_subtopic_artifacts("missing", &SubtopicArtifactUpdate::default());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_quiz_round_trip() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();
        let section = store.ensure_section(&course.id, 0, "Intro").unwrap();

        store
            .insert_quiz(NewQuiz {
                course_id: course.id.clone(),
                section_id: section.id.clone(),
                title: "Intro Quiz".to_string(),
                questions: vec![
                    NewQuizQuestion {
                        question: "What is Rust?".to_string(),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_index: 1,
                    },
                    NewQuizQuestion {
                        question: "What is cargo?".to_string(),
                        options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
                        correct_index: 3,
                    },
                ],
            })
            .unwrap();

        let quizzes = store.list_quizzes(&course.id).unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].questions.len(), 2);
        assert_eq!(quizzes[0].questions[0].question, "What is Rust?");
        assert_eq!(quizzes[0].questions[1].correct_index, 3);
        assert_eq!(quizzes[0].questions[1].options.len(), 4);
    }

    #[test]
    fn test_flashcard_round_trip() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();
        let section = store.ensure_section(&course.id, 0, "Intro").unwrap();

        store
            .insert_flashcard(NewFlashcard {
                course_id: course.id.clone(),
                section_id: section.id.clone(),
                front: "What is ownership?".to_string(),
                back: "A set of rules governing memory.".to_string(),
            })
            .unwrap();

        let cards = store.list_flashcards(&course.id).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "What is ownership?");
    }

    #[test]
    fn test_embedding_dedup_by_content_hash() {
        let store = create_test_store();
        let course = store.ensure_course(None, "Course", None).unwrap();

        let embedding = NewEmbedding {
            course_id: course.id.clone(),
            scope: EmbeddingScope::Subtopic,
            ref_id: Some("sub-1".to_string()),
            content_hash: "abc123".to_string(),
            vector: vec![0.1, 0.2, 0.3],
            model: "text-embedding-3-small".to_string(),
        };

        assert!(store.try_insert_embedding(embedding.clone()).unwrap());
        assert!(!store.try_insert_embedding(embedding).unwrap());
        assert!(store.embedding_exists("abc123").unwrap());
        assert!(!store.embedding_exists("other").unwrap());

        let rows = store.list_embeddings(&course.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dimensions, 3);
        assert_eq!(rows[0].scope, EmbeddingScope::Subtopic);
    }

    #[test]
    fn test_roadmap_round_trip() {
        let store = create_test_store();
        let data = serde_json::json!({"Intro": ["What is X", "Why X matters"]});

        let saved = store
            .insert_roadmap(NewRoadmap {
                course_id: None,
                title: Some("Intro course".to_string()),
                data: data.clone(),
            })
            .unwrap();

        let fetched = store.get_roadmap(&saved.id).unwrap().unwrap();
        assert_eq!(fetched.data, data);
        assert!(store.get_roadmap("missing").unwrap().is_none());
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("courses.db");

        let store = SqliteCourseStore::new(&db_path).unwrap();
        let course = store.ensure_course(None, "Course", None).unwrap();
        assert!(db_path.exists());
        assert!(store.get_course(&course.id).unwrap().is_some());
    }
}
