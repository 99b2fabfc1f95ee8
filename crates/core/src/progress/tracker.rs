use chrono::Utc;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::store::StoreError;

use super::emitter::{ProgressEmitter, EVENT_COMPLETED, EVENT_FAILED, EVENT_PROGRESS};
use super::store::ProgressStore;
use super::types::{ErrorLogEntry, ProgressStatus, ProgressUpdate};
use super::StageBudget;

/// Per-job progress front end: persists each update and mirrors it onto
/// the real-time channel.
///
/// Reported percentages are clamped to be non-decreasing within the run;
/// a fresh attempt starts a fresh tracker and may legitimately restart
/// from zero. Store failures are logged and swallowed so observability
/// problems never take the pipeline down.
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    emitter: ProgressEmitter,
    progress_id: String,
    session_id: String,
    course_id: Mutex<Option<String>>,
    last_percentage: Mutex<f64>,
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        emitter: ProgressEmitter,
        progress_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            emitter,
            progress_id: progress_id.into(),
            session_id: session_id.into(),
            course_id: Mutex::new(None),
            last_percentage: Mutex::new(0.0),
        }
    }

    pub fn progress_id(&self) -> &str {
        &self.progress_id
    }

    pub fn course_id(&self) -> Option<String> {
        self.course_id.lock().unwrap().clone()
    }

    /// Attach the course id once it is known; later events switch to the
    /// course topic.
    pub fn set_course_id(&self, course_id: impl Into<String>) {
        *self.course_id.lock().unwrap() = Some(course_id.into());
    }

    /// Ensure the progress row exists and mark the job as processing.
    pub async fn begin(&self) {
        let course_id = self.course_id();
        if let Err(e) = self
            .store
            .create(&self.progress_id, course_id.as_deref(), &self.session_id)
        {
            self.log_store_error("create", &e);
        }
        self.apply(ProgressUpdate {
            course_id,
            status: Some(ProgressStatus::Processing),
            current_step: Some("Starting course generation".to_string()),
            progress_percentage: Some(0.0),
            ..Default::default()
        });
        self.emit_progress("Starting course generation", 0.0, None, None)
            .await;
    }

    /// Report one finished unit of work.
    pub async fn update_step(
        &self,
        step: &str,
        percentage: f64,
        section_index: Option<u32>,
        subtopic_index: Option<u32>,
    ) {
        let percentage = self.advance_percentage(percentage);
        self.apply(ProgressUpdate {
            course_id: self.course_id(),
            current_step: Some(step.to_string()),
            progress_percentage: Some(percentage),
            current_section_index: section_index,
            current_subtopic_index: subtopic_index,
            ..Default::default()
        });
        self.emit_progress(step, percentage, section_index, subtopic_index)
            .await;
    }

    /// Append a non-fatal error to the job's error log.
    pub async fn record_error(&self, step: &str, message: &str) {
        warn!(step, message, "Recording pipeline error");
        self.apply(ProgressUpdate {
            append_error: Some(ErrorLogEntry::new(step, message)),
            ..Default::default()
        });
    }

    /// Terminal success: percentage 100 and the full course package as
    /// the event payload.
    pub async fn complete(&self, package: Value) {
        self.apply(ProgressUpdate {
            course_id: self.course_id(),
            status: Some(ProgressStatus::Completed),
            current_step: Some("Completed".to_string()),
            progress_percentage: Some(StageBudget::COMPLETE),
            completed_at: Some(Utc::now()),
            ..Default::default()
        });
        let course_id = self.course_id();
        self.emitter
            .emit(
                course_id.as_deref(),
                &self.session_id,
                EVENT_COMPLETED,
                &json!({
                    "progressId": self.progress_id,
                    "status": ProgressStatus::Completed,
                    "progressPercentage": StageBudget::COMPLETE,
                    "result": package,
                }),
            )
            .await;
    }

    /// Terminal failure: the stored row keeps its last real percentage,
    /// the event carries the sentinel so subscribers can tell failure
    /// from stall.
    pub async fn fail(&self, step: &str, errors: Vec<String>) {
        for message in &errors {
            self.apply(ProgressUpdate {
                append_error: Some(ErrorLogEntry::new(step, message.clone())),
                ..Default::default()
            });
        }
        self.apply(ProgressUpdate {
            status: Some(ProgressStatus::Failed),
            current_step: Some(step.to_string()),
            completed_at: Some(Utc::now()),
            ..Default::default()
        });
        let course_id = self.course_id();
        self.emitter
            .emit(
                course_id.as_deref(),
                &self.session_id,
                EVENT_FAILED,
                &json!({
                    "progressId": self.progress_id,
                    "status": ProgressStatus::Failed,
                    "progressPercentage": StageBudget::FAILURE_SENTINEL,
                    "step": step,
                    "errors": errors,
                }),
            )
            .await;
    }

    fn advance_percentage(&self, requested: f64) -> f64 {
        let mut last = self.last_percentage.lock().unwrap();
        if requested > *last {
            *last = requested;
        }
        *last
    }

    fn apply(&self, update: ProgressUpdate) {
        if let Err(e) = self.store.update(&self.progress_id, &update) {
            self.log_store_error("update", &e);
        }
    }

    async fn emit_progress(
        &self,
        step: &str,
        percentage: f64,
        section_index: Option<u32>,
        subtopic_index: Option<u32>,
    ) {
        let course_id = self.course_id();
        self.emitter
            .emit(
                course_id.as_deref(),
                &self.session_id,
                EVENT_PROGRESS,
                &json!({
                    "progressId": self.progress_id,
                    "status": ProgressStatus::Processing,
                    "currentStep": step,
                    "progressPercentage": percentage,
                    "currentSectionIndex": section_index,
                    "currentSubtopicIndex": subtopic_index,
                }),
            )
            .await;
    }

    fn log_store_error(&self, operation: &str, error: &StoreError) {
        warn!(
            progress_id = %self.progress_id,
            operation,
            error = %error,
            "Progress persistence failed"
        );
    }
}
