//! Pipeline stages.
//!
//! Each stage walks the section×subtopic plan in order, doing only its own
//! slice of work and reporting into its fixed progress window. Per-unit
//! failures are recorded and skipped; only systemic errors (persistence,
//! workspace filesystem) escape a stage and abort the job.

mod assessment;
mod audio;
mod content;
mod embedding;
mod publish;
mod slides;
mod video;

pub use assessment::run_assessment;
pub use audio::run_audio_synthesis;
pub use content::run_text_content;
pub use embedding::run_embeddings;
pub use publish::run_artifact_publish;
pub use slides::run_slide_render;
pub use video::run_video_compile;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::embeddings::EmbeddingService;
use crate::llm::CompletionService;
use crate::media::MediaEngine;
use crate::progress::ProgressTracker;
use crate::renderer::SlideRenderer;
use crate::speech::SpeechClient;
use crate::storage::ObjectStore;
use crate::store::{CourseStore, SectionRow, SubtopicRow};

use super::config::PipelineConfig;
use super::error::{Severity, StageError};
use super::workspace::WorkspaceLayout;

/// Everything a stage needs, injected once at pipeline construction.
pub struct StageContext {
    pub config: PipelineConfig,
    pub store: Arc<dyn CourseStore>,
    pub completions: CompletionService,
    pub speech: Arc<dyn SpeechClient>,
    pub embeddings: EmbeddingService,
    pub renderer: Arc<dyn SlideRenderer>,
    pub media: Arc<dyn MediaEngine>,
    pub objects: Arc<dyn ObjectStore>,
    pub workspace: WorkspaceLayout,
}

impl StageContext {
    /// Fixed spacing between external calls.
    pub(crate) async fn pace(&self) {
        if self.config.inter_call_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.inter_call_delay_ms)).await;
        }
    }
}

/// One section's persisted row plus its deduplicated subtopic rows, in
/// processing order. Built once per run; stages never mutate it.
#[derive(Debug, Clone)]
pub struct SectionPlan {
    pub row: SectionRow,
    pub subtopics: Vec<SubtopicRow>,
}

/// Subtopics across the whole plan.
pub(crate) fn total_subtopics(plan: &[SectionPlan]) -> usize {
    plan.iter().map(|section| section.subtopics.len()).sum()
}

/// Handle one failed unit of stage work: recoverable errors go into the
/// job's error log and the walk continues, fatal ones abort the job.
pub(crate) async fn absorb_unit_error(
    tracker: &ProgressTracker,
    step: &'static str,
    unit: &str,
    error: StageError,
) -> Result<(), StageError> {
    if error.severity() == Severity::Fatal {
        return Err(error);
    }
    warn!(step, unit, error = %error, "Unit failed, continuing");
    tracker
        .record_error(step, &format!("{}: {}", unit, error))
        .await;
    Ok(())
}

/// Read a text file that may legitimately not exist yet; whitespace-only
/// content counts as absent.
pub(crate) async fn read_if_present(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => Some(content),
        _ => None,
    }
}

/// Truncate on a char boundary.
pub(crate) fn bounded(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Rendered slide images under `dir`, sorted by filename so frame order
/// matches slide order. A missing directory is just "no slides yet".
pub(crate) async fn collect_slide_images(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut images = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(images),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("slide") && name.ends_with(".png") {
            images.push(entry.path());
        }
    }
    images.sort();
    Ok(images)
}
