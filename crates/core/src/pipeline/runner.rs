//! Job orchestrator: drives one generation job through every stage.
//!
//! The pipeline is strictly sequential. Later stages consume artifacts
//! the earlier ones leave on disk and in the store, and the external
//! tools involved are resource-hungry enough that fanning out inside a
//! job buys nothing. Concurrency lives one level up, across jobs.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::metrics;
use crate::progress::{ProgressEmitter, ProgressStore, ProgressTracker, RealtimeChannel, StageBudget};
use crate::queue::GenerationJob;
use crate::roadmap::{normalize, Roadmap};
use crate::store::CourseRow;

use super::error::{PipelineError, StageError};
use super::stages::{
    run_artifact_publish, run_assessment, run_audio_synthesis, run_embeddings, run_slide_render,
    run_text_content, run_video_compile, SectionPlan, StageContext,
};
use super::types::{CoursePackage, GenerationSummary, SectionPackage};

const ORCHESTRATOR_STEP: &str = "JobOrchestrator";
const DEFAULT_COURSE_TITLE: &str = "Untitled Course";

/// A failure pinned to the step that raised it, so the progress record
/// names the stage a reader should go look at.
struct JobFailure {
    step: &'static str,
    error: PipelineError,
}

fn fail_at<E: Into<PipelineError>>(step: &'static str) -> impl FnOnce(E) -> JobFailure {
    move |e| JobFailure {
        step,
        error: e.into(),
    }
}

/// One worker slot's view of course generation: takes a leased job,
/// produces a complete course package or a recorded failure.
pub struct CoursePipeline {
    ctx: StageContext,
    progress_store: Arc<dyn ProgressStore>,
    channel: Arc<dyn RealtimeChannel>,
    max_attempts: u32,
}

impl CoursePipeline {
    pub fn new(
        ctx: StageContext,
        progress_store: Arc<dyn ProgressStore>,
        channel: Arc<dyn RealtimeChannel>,
        max_attempts: u32,
    ) -> Self {
        Self {
            ctx,
            progress_store,
            channel,
            max_attempts,
        }
    }

    /// Run one job start to finish. Every outcome lands in the progress
    /// record: completion carries the package, failure carries the step
    /// and its errors.
    pub async fn process(&self, job: GenerationJob) -> Result<CoursePackage, PipelineError> {
        let tracker = ProgressTracker::new(
            self.progress_store.clone(),
            ProgressEmitter::new(self.channel.clone()),
            &job.progress_id,
            &job.session_id,
        );
        if let Some(course_id) = &job.course_id {
            tracker.set_course_id(course_id);
        }

        // The attempts ceiling is checked before any work, so a job that
        // already burned its attempts cannot touch external services again.
        if job.attempts_made >= self.max_attempts {
            metrics::JOBS_TOTAL.with_label_values(&["rejected"]).inc();
            error!(
                progress_id = %job.progress_id,
                attempts = job.attempts_made,
                "Job exceeded the attempt ceiling, rejecting"
            );
            tracker
                .fail(
                    ORCHESTRATOR_STEP,
                    vec![format!(
                        "generation failed after {} attempts",
                        job.attempts_made
                    )],
                )
                .await;
            return Err(PipelineError::AttemptsExhausted {
                attempts: job.attempts_made,
            });
        }

        tracker.begin().await;
        info!(
            progress_id = %job.progress_id,
            attempt = job.attempts_made + 1,
            "Starting course generation"
        );

        match self.run(&job, &tracker).await {
            Ok(package) => {
                metrics::JOBS_TOTAL.with_label_values(&["completed"]).inc();
                info!(
                    progress_id = %job.progress_id,
                    course_id = %package.course_id,
                    videos = package.videos.len(),
                    "Course generation completed"
                );
                let payload = serde_json::to_value(&package).unwrap_or_default();
                tracker.complete(payload).await;
                Ok(package)
            }
            Err(failure) => {
                metrics::JOBS_TOTAL.with_label_values(&["failed"]).inc();
                error!(
                    progress_id = %job.progress_id,
                    step = failure.step,
                    error = %failure.error,
                    "Course generation failed"
                );
                tracker
                    .fail(failure.step, vec![failure.error.to_string()])
                    .await;
                Err(failure.error)
            }
        }
    }

    async fn run(
        &self,
        job: &GenerationJob,
        tracker: &ProgressTracker,
    ) -> Result<CoursePackage, JobFailure> {
        let roadmap = self.resolve_roadmap(job).map_err(fail_at(ORCHESTRATOR_STEP))?;
        let title = roadmap
            .course_title
            .clone()
            .unwrap_or_else(|| DEFAULT_COURSE_TITLE.to_string());

        let course = self
            .ctx
            .store
            .ensure_course(job.course_id.as_deref(), &title, job.tutor_id.as_deref())
            .map_err(fail_at(ORCHESTRATOR_STEP))?;
        tracker.set_course_id(&course.id);

        let plan = self
            .build_plan(&course, &roadmap)
            .map_err(fail_at(ORCHESTRATOR_STEP))?;
        tracker
            .update_step("Prepared course structure", StageBudget::INIT.end(), None, None)
            .await;

        let ctx = &self.ctx;
        timed_stage("text", run_text_content(ctx, &course, &plan, &roadmap, tracker))
            .await
            .map_err(fail_at("TextContentStage"))?;
        timed_stage("audio", run_audio_synthesis(ctx, &course, &plan, tracker))
            .await
            .map_err(fail_at("AudioSynthesisStage"))?;
        timed_stage("render", run_slide_render(ctx, &course, &plan, tracker))
            .await
            .map_err(fail_at("SlideRenderStage"))?;
        timed_stage("video", run_video_compile(ctx, &course, &plan, tracker))
            .await
            .map_err(fail_at("VideoCompileStage"))?;
        timed_stage("publish", run_artifact_publish(ctx, &course, &plan, tracker))
            .await
            .map_err(fail_at("ArtifactPublishStage"))?;
        timed_stage("assessment", run_assessment(ctx, &course, &plan, tracker))
            .await
            .map_err(fail_at("AssessmentStage"))?;
        timed_stage("embeddings", run_embeddings(ctx, &course, &plan, &roadmap, tracker))
            .await
            .map_err(fail_at("EmbeddingStage"))?;

        self.build_package(&course, job)
            .map_err(fail_at(ORCHESTRATOR_STEP))
    }

    /// Inline roadmap data wins; otherwise the referenced stored roadmap.
    /// A job carrying neither cannot produce anything.
    fn resolve_roadmap(&self, job: &GenerationJob) -> Result<Roadmap, PipelineError> {
        if let Some(data) = &job.roadmap_data {
            return Ok(normalize(data)?);
        }
        if let Some(roadmap_id) = &job.roadmap_id {
            let row = self.ctx.store.get_roadmap(roadmap_id)?.ok_or_else(|| {
                PipelineError::missing_roadmap(format!("roadmap {roadmap_id} not found"))
            })?;
            return Ok(normalize(&row.data)?);
        }
        Err(PipelineError::missing_roadmap(
            "job carries neither roadmapData nor a roadmapId",
        ))
    }

    /// Persist the course skeleton and snapshot it as the processing
    /// plan. Duplicate subtopic titles within a section are dropped here,
    /// once, so no stage ever sees the same unit twice.
    fn build_plan(
        &self,
        course: &CourseRow,
        roadmap: &Roadmap,
    ) -> Result<Vec<SectionPlan>, PipelineError> {
        let mut plan = Vec::with_capacity(roadmap.sections.len());
        for (position, section) in roadmap.sections.iter().enumerate() {
            let row =
                self.ctx
                    .store
                    .ensure_section(&course.id, position as u32, &section.title)?;

            let mut seen = HashSet::new();
            let mut subtopics = Vec::new();
            for title in &section.subtopics {
                if !seen.insert(title.to_lowercase()) {
                    warn!(
                        section = %section.title,
                        subtopic = %title,
                        "Duplicate subtopic title in section, skipping"
                    );
                    metrics::STAGE_UNITS
                        .with_label_values(&["text", "skipped"])
                        .inc();
                    continue;
                }
                let subtopic =
                    self.ctx
                        .store
                        .ensure_subtopic(&row.id, subtopics.len() as u32, title)?;
                subtopics.push(subtopic);
            }
            plan.push(SectionPlan { row, subtopics });
        }
        Ok(plan)
    }

    /// Re-read everything from the store so the package reflects what was
    /// actually persisted, not what this run thinks it did.
    fn build_package(
        &self,
        course: &CourseRow,
        job: &GenerationJob,
    ) -> Result<CoursePackage, PipelineError> {
        let store = &self.ctx.store;
        let sections = store.list_sections(&course.id)?;

        let mut section_packages = Vec::with_capacity(sections.len());
        let mut videos = Vec::new();
        let mut total_subtopics = 0usize;
        for section in sections {
            let subtopics = store.list_subtopics(&section.id)?;
            total_subtopics += subtopics.len();
            videos.extend(subtopics.iter().filter_map(|s| s.video_url.clone()));
            section_packages.push(SectionPackage { section, subtopics });
        }

        let quizzes = store.list_quizzes(&course.id)?;
        let flashcards = store.list_flashcards(&course.id)?;
        let generation_summary = GenerationSummary {
            total_sections: section_packages.len(),
            total_subtopics,
            total_videos: videos.len(),
            total_quizzes: quizzes.len(),
            total_flashcards: flashcards.len(),
            session_id: job.session_id.clone(),
            generated_at: chrono::Utc::now(),
        };

        Ok(CoursePackage {
            course_id: course.id.clone(),
            title: course.title.clone(),
            sections: section_packages,
            quizzes,
            flashcards,
            videos,
            generation_summary,
        })
    }
}

async fn timed_stage<F>(stage: &'static str, fut: F) -> Result<(), StageError>
where
    F: Future<Output = Result<(), StageError>>,
{
    let started = Instant::now();
    let result = fut.await;
    metrics::STAGE_DURATION
        .with_label_values(&[stage])
        .observe(started.elapsed().as_secs_f64());
    result
}
