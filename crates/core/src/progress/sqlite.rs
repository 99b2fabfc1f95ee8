//! SQLite-backed progress store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::store::StoreError;

use super::store::ProgressStore;
use super::types::{ErrorLogEntry, GenerationProgress, ProgressStatus, ProgressUpdate};

pub struct SqliteProgressStore {
    conn: Mutex<Connection>,
}

impl SqliteProgressStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

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
            CREATE TABLE IF NOT EXISTS generation_progress (
                id TEXT PRIMARY KEY,
                course_id TEXT,
                session_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                current_step TEXT NOT NULL DEFAULT '',
                progress_percentage REAL NOT NULL DEFAULT 0,
                current_section_index INTEGER,
                current_subtopic_index INTEGER,
                error_log TEXT NOT NULL DEFAULT '[]',
                completed_at TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn row_to_progress(row: &rusqlite::Row) -> rusqlite::Result<GenerationProgress> {
        let status_str: String = row.get(3)?;
        let error_log_json: String = row.get(8)?;
        let completed_at_str: Option<String> = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        Ok(GenerationProgress {
            progress_id: row.get(0)?,
            course_id: row.get(1)?,
            session_id: row.get(2)?,
            status: ProgressStatus::parse(&status_str).unwrap_or(ProgressStatus::Pending),
            current_step: row.get(4)?,
            progress_percentage: row.get(5)?,
            current_section_index: row.get(6)?,
            current_subtopic_index: row.get(7)?,
            error_log: serde_json::from_str(&error_log_json).unwrap_or_default(),
            completed_at: completed_at_str.as_deref().and_then(parse_timestamp),
            updated_at: parse_timestamp(&updated_at_str).unwrap_or_else(Utc::now),
        })
    }

    fn get_locked(
        conn: &Connection,
        progress_id: &str,
    ) -> Result<Option<GenerationProgress>, StoreError> {
        conn.query_row(
            "SELECT id, course_id, session_id, status, current_step, progress_percentage, current_section_index, current_subtopic_index, error_log, completed_at, updated_at FROM generation_progress WHERE id = ?",
            params![progress_id],
            Self::row_to_progress,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

impl ProgressStore for SqliteProgressStore {
    fn create(
        &self,
        progress_id: &str,
        course_id: Option<&str>,
        session_id: &str,
    ) -> Result<GenerationProgress, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT OR IGNORE INTO generation_progress (id, course_id, session_id, status, updated_at) VALUES (?, ?, ?, 'pending', ?)",
            params![progress_id, course_id, session_id, now.to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Self::get_locked(&conn, progress_id)?
            .ok_or_else(|| StoreError::Database("progress row vanished after insert".to_string()))
    }

    fn get(&self, progress_id: &str) -> Result<Option<GenerationProgress>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, progress_id)
    }

    fn update(&self, progress_id: &str, update: &ProgressUpdate) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = match Self::get_locked(&conn, progress_id)? {
            Some(progress) => progress,
            // Unknown progress id: nothing to merge into.
            None => return Ok(()),
        };

        let mut error_log = current.error_log;
        if let Some(entry) = &update.append_error {
            error_log.push(entry.clone());
        }
        let error_log_json = serde_json::to_string::<Vec<ErrorLogEntry>>(&error_log)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE generation_progress SET course_id = ?, status = ?, current_step = ?, progress_percentage = ?, current_section_index = ?, current_subtopic_index = ?, error_log = ?, completed_at = ?, updated_at = ? WHERE id = ?",
            params![
                update.course_id.clone().or(current.course_id),
                update.status.unwrap_or(current.status).as_str(),
                update
                    .current_step
                    .clone()
                    .unwrap_or(current.current_step),
                update
                    .progress_percentage
                    .unwrap_or(current.progress_percentage),
                update.current_section_index.or(current.current_section_index),
                update
                    .current_subtopic_index
                    .or(current.current_subtopic_index),
                error_log_json,
                update
                    .completed_at
                    .or(current.completed_at)
                    .map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339(),
                progress_id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}
