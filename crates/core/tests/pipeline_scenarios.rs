//! Full pipeline integration tests.
//!
//! These tests drive complete generation jobs through every stage with
//! mocked external services and real in-memory SQLite stores:
//! - a flat roadmap produces videos, assessments and embeddings end to end
//! - renderer failures degrade to placeholder slides without failing the job
//! - speech failures produce silent videos and a failed audio status
//! - the attempt ceiling rejects a job before any external call
//! - re-running a finished course skips regeneration and re-embedding

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use courseforge_core::embeddings::{EmbeddingClient, EmbeddingService};
use courseforge_core::llm::{CompletionService, LlmClient};
use courseforge_core::media::MediaEngine;
use courseforge_core::pipeline::{
    CoursePackage, CoursePipeline, PipelineConfig, PipelineError, StageContext, WorkspaceLayout,
};
use courseforge_core::progress::{
    ProgressStatus, ProgressStore, RealtimeChannel, SqliteProgressStore, EVENT_COMPLETED,
    EVENT_FAILED, EVENT_PROGRESS,
};
use courseforge_core::queue::GenerationJob;
use courseforge_core::renderer::SlideRenderer;
use courseforge_core::retry::RetryPolicy;
use courseforge_core::speech::SpeechClient;
use courseforge_core::storage::ObjectStore;
use courseforge_core::store::{
    ArtifactStatus, CourseStore, EmbeddingScope, NewRoadmap, SqliteCourseStore,
};
use courseforge_core::testing::{
    fixtures, MockCompletionClient, MockEmbeddingClient, MockMediaEngine, MockObjectStore,
    MockRealtimeChannel, MockSlideRenderer, MockSpeechClient,
};

const MAX_ATTEMPTS: u32 = 3;

/// Test helper holding the pipeline plus handles to every mock and store
/// for assertions.
struct TestHarness {
    pipeline: CoursePipeline,
    store: Arc<SqliteCourseStore>,
    progress: Arc<SqliteProgressStore>,
    channel: Arc<MockRealtimeChannel>,
    llm: Arc<MockCompletionClient>,
    speech: Arc<MockSpeechClient>,
    embedder: Arc<MockEmbeddingClient>,
    renderer: Arc<MockSlideRenderer>,
    media: Arc<MockMediaEngine>,
    objects: Arc<MockObjectStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let store = Arc::new(SqliteCourseStore::in_memory().expect("Failed to create store"));
        let progress =
            Arc::new(SqliteProgressStore::in_memory().expect("Failed to create progress store"));
        let channel = Arc::new(MockRealtimeChannel::new());

        let llm = Arc::new(MockCompletionClient::new());
        // The transcript prompt embeds the deck, so its marker has to be
        // checked before the plain deck marker.
        llm.stub_contains("timestamped transcript", fixtures::transcript());
        llm.stub_contains("existing narration", fixtures::deck_markdown());
        llm.stub_contains("slide deck", fixtures::deck_markdown());
        llm.stub_contains("multiple-choice quiz", fixtures::quiz_json());
        llm.stub_contains("flashcard", fixtures::flashcard_json());

        let speech = Arc::new(MockSpeechClient::new());
        let embedder = Arc::new(MockEmbeddingClient::new());
        let renderer = Arc::new(MockSlideRenderer::new());
        let media = Arc::new(MockMediaEngine::new());
        let objects = Arc::new(MockObjectStore::new());

        let ctx = StageContext {
            config: PipelineConfig::without_delays(),
            store: Arc::clone(&store) as Arc<dyn CourseStore>,
            completions: CompletionService::new(
                Arc::clone(&llm) as Arc<dyn LlmClient>,
                RetryPolicy::none(),
            ),
            speech: Arc::clone(&speech) as Arc<dyn SpeechClient>,
            embeddings: EmbeddingService::new(
                Arc::clone(&embedder) as Arc<dyn EmbeddingClient>,
                RetryPolicy::none(),
            ),
            renderer: Arc::clone(&renderer) as Arc<dyn SlideRenderer>,
            media: Arc::clone(&media) as Arc<dyn MediaEngine>,
            objects: Arc::clone(&objects) as Arc<dyn ObjectStore>,
            workspace: WorkspaceLayout::new(temp_dir.path()),
        };

        let pipeline = CoursePipeline::new(
            ctx,
            Arc::clone(&progress) as Arc<dyn ProgressStore>,
            Arc::clone(&channel) as Arc<dyn RealtimeChannel>,
            MAX_ATTEMPTS,
        );

        Self {
            pipeline,
            store,
            progress,
            channel,
            llm,
            speech,
            embedder,
            renderer,
            media,
            objects,
            _temp_dir: temp_dir,
        }
    }

    async fn run(&self, job: GenerationJob) -> Result<CoursePackage, PipelineError> {
        self.pipeline.process(job).await
    }
}

fn make_job(progress_id: &str, roadmap_data: Value) -> GenerationJob {
    GenerationJob {
        course_id: None,
        roadmap_id: None,
        progress_id: progress_id.to_string(),
        roadmap_data: Some(roadmap_data),
        session_id: "sess-1".to_string(),
        tutor_id: Some("tutor-1".to_string()),
        attempts_made: 0,
    }
}

#[tokio::test]
async fn test_flat_roadmap_generates_complete_course() {
    let h = TestHarness::new();
    let package = h
        .run(make_job("prog-flat", fixtures::roadmap_flat()))
        .await
        .expect("job should complete");

    assert_eq!(package.title, "Untitled Course");
    assert_eq!(package.sections.len(), 1);
    assert_eq!(package.sections[0].subtopics.len(), 2);
    assert_eq!(package.videos.len(), 2);
    assert_eq!(package.quizzes.len(), 1);
    assert_eq!(package.quizzes[0].questions.len(), 5);
    assert_eq!(package.flashcards.len(), 1);
    assert_eq!(package.generation_summary.total_subtopics, 2);

    for section in &package.sections {
        for subtopic in &section.subtopics {
            assert_eq!(subtopic.status, ArtifactStatus::Completed);
            assert!(subtopic.markdown_path.is_some());
            assert!(subtopic.transcript_path.is_some());
            assert!(subtopic.audio_path.is_some());
            let url = subtopic.video_url.as_deref().expect("video url");
            assert!(url.starts_with("https://cdn.test/courses/"));
        }
    }

    // Course, one section, two subtopics.
    let embeddings = h.store.list_embeddings(&package.course_id).unwrap();
    assert_eq!(embeddings.len(), 4);

    let uploads = h.objects.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.public && u.content_type == "video/mp4"));
    assert!(uploads.iter().all(|u| u.key.ends_with(".mp4")));

    let row = h.progress.get("prog-flat").unwrap().expect("progress row");
    assert_eq!(row.status, ProgressStatus::Completed);
    assert_eq!(row.progress_percentage, 100.0);
    assert!(row.error_log.is_empty());

    let completed = h.channel.published_events(EVENT_COMPLETED);
    assert_eq!(completed.len(), 1);
    assert!(completed[0].payload.get("result").is_some());
}

#[tokio::test]
async fn test_tree_roadmap_resolved_from_store_by_id() {
    let h = TestHarness::new();
    let roadmap = h
        .store
        .insert_roadmap(NewRoadmap {
            course_id: None,
            title: Some("X from Scratch".to_string()),
            data: fixtures::roadmap_tree(),
        })
        .unwrap();

    let mut job = make_job("prog-tree", json!(null));
    job.roadmap_data = None;
    job.roadmap_id = Some(roadmap.id.clone());

    let package = h.run(job).await.expect("job should complete");
    assert_eq!(package.title, "X from Scratch");
    assert_eq!(package.sections.len(), 2);
    assert_eq!(package.generation_summary.total_subtopics, 3);
    assert_eq!(package.videos.len(), 3);
}

#[tokio::test]
async fn test_renderer_failure_degrades_to_placeholder_videos() {
    let h = TestHarness::new();
    h.renderer.set_fail_all(true);

    let package = h
        .run(make_job("prog-render-fail", fixtures::roadmap_flat()))
        .await
        .expect("render failures must not fail the job");

    // Placeholder frames still become videos.
    assert_eq!(package.videos.len(), 2);
    assert!(!h.media.placeholders().is_empty());
    // Standard and defensive attempts for each of the two subtopics.
    assert_eq!(h.renderer.call_count(), 4);

    let row = h.progress.get("prog-render-fail").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);
    let render_errors: Vec<_> = row
        .error_log
        .iter()
        .filter(|e| e.step == "SlideRenderStage")
        .collect();
    assert_eq!(render_errors.len(), 2); // one entry per subtopic
    assert_eq!(row.error_log.len(), 2);
}

#[tokio::test]
async fn test_render_ladder_recovers_with_defensive_invocation() {
    let h = TestHarness::new();
    h.renderer.set_fail_standard(true);

    let package = h
        .run(make_job("prog-defensive", fixtures::roadmap_flat()))
        .await
        .expect("defensive retry should succeed");

    assert_eq!(package.videos.len(), 2);
    assert!(h.media.placeholders().is_empty());

    let row = h.progress.get("prog-defensive").unwrap().unwrap();
    assert!(row.error_log.is_empty());
}

#[tokio::test]
async fn test_speech_failure_produces_silent_videos() {
    let h = TestHarness::new();
    h.speech.set_fail_all(true);

    let package = h
        .run(make_job("prog-no-audio", fixtures::roadmap_flat()))
        .await
        .expect("audio failures must not fail the job");

    assert_eq!(package.videos.len(), 2);
    let compiled = h.media.compiled();
    assert_eq!(compiled.len(), 2);
    assert!(compiled.iter().all(|c| !c.has_narration));

    // Publication still completes the subtopics; audio stays failed on
    // the way there.
    for section in &package.sections {
        for subtopic in &section.subtopics {
            assert_eq!(subtopic.status, ArtifactStatus::Completed);
            assert!(subtopic.audio_path.is_none());
        }
    }

    let row = h.progress.get("prog-no-audio").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);
    let audio_errors: Vec<_> = row
        .error_log
        .iter()
        .filter(|e| e.step == "AudioSynthesisStage")
        .collect();
    assert_eq!(audio_errors.len(), 2);
}

#[tokio::test]
async fn test_attempt_ceiling_rejects_job_before_any_work() {
    let h = TestHarness::new();
    h.progress.create("prog-burned", None, "sess-1").unwrap();

    let mut job = make_job("prog-burned", fixtures::roadmap_flat());
    job.attempts_made = MAX_ATTEMPTS;

    let result = h.run(job).await;
    assert!(matches!(
        result,
        Err(PipelineError::AttemptsExhausted { attempts: 3 })
    ));

    // No stage ran, no external service was touched.
    assert_eq!(h.llm.request_count(), 0);
    assert!(h.speech.synthesized().is_empty());
    assert_eq!(h.embedder.call_count(), 0);
    assert_eq!(h.renderer.call_count(), 0);
    assert!(h.media.compiled().is_empty());
    assert!(h.objects.uploads().is_empty());

    let row = h.progress.get("prog-burned").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Failed);
    assert_eq!(row.error_log.len(), 1);
    assert_eq!(row.error_log[0].step, "JobOrchestrator");

    let failed = h.channel.published_events(EVENT_FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["progressPercentage"], json!(-1.0));
}

#[tokio::test]
async fn test_job_without_roadmap_fails_at_orchestrator() {
    let h = TestHarness::new();
    let mut job = make_job("prog-no-roadmap", json!(null));
    job.roadmap_data = None;

    let result = h.run(job).await;
    assert!(matches!(result, Err(PipelineError::MissingRoadmap { .. })));

    let row = h.progress.get("prog-no-roadmap").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Failed);
    assert_eq!(row.error_log[0].step, "JobOrchestrator");
    assert_eq!(h.llm.request_count(), 0);
}

#[tokio::test]
async fn test_duplicate_subtopic_titles_skipped_not_logged() {
    let h = TestHarness::new();
    let roadmap = json!({
        "Intro": ["What is X", "what is x", "Why X matters"],
    });

    let package = h
        .run(make_job("prog-dupes", roadmap))
        .await
        .expect("job should complete");

    assert_eq!(package.generation_summary.total_subtopics, 2);
    assert_eq!(package.videos.len(), 2);

    // Duplicates are warnings, not errors.
    let row = h.progress.get("prog-dupes").unwrap().unwrap();
    assert!(row.error_log.is_empty());
}

#[tokio::test]
async fn test_section_without_subtopics_yields_no_artifacts() {
    let h = TestHarness::new();
    let roadmap = json!({
        "Orientation": [],
        "Body": ["What is X"],
    });

    let package = h
        .run(make_job("prog-empty-section", roadmap))
        .await
        .expect("job should complete");

    assert_eq!(package.sections.len(), 2);
    assert!(package.sections[0].subtopics.is_empty());
    assert_eq!(package.sections[1].subtopics.len(), 1);
    assert_eq!(package.generation_summary.total_subtopics, 1);
    assert_eq!(package.videos.len(), 1);

    // The empty section has no content to assess.
    assert_eq!(package.quizzes.len(), 1);
    assert_eq!(package.flashcards.len(), 1);
    assert_eq!(package.quizzes[0].section_id, package.sections[1].section.id);

    // Course + both sections + the one subtopic; an empty section still
    // contributes a section-level chunk but no subtopic chunks.
    let embeddings = h.store.list_embeddings(&package.course_id).unwrap();
    assert_eq!(embeddings.len(), 4);
    let scope_count = |scope| embeddings.iter().filter(|e| e.scope == scope).count();
    assert_eq!(scope_count(EmbeddingScope::Course), 1);
    assert_eq!(scope_count(EmbeddingScope::Section), 2);
    assert_eq!(scope_count(EmbeddingScope::Subtopic), 1);

    // Skipping an empty section is not an error.
    let row = h.progress.get("prog-empty-section").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);
    assert!(row.error_log.is_empty());
}

#[tokio::test]
async fn test_invalid_quiz_json_discarded_without_failing_section() {
    let h = TestHarness::new();
    h.llm
        .stub_contains("multiple-choice quiz", "this is not json at all");

    let package = h
        .run(make_job("prog-bad-quiz", fixtures::roadmap_flat()))
        .await
        .expect("job should complete");

    assert!(package.quizzes.is_empty());
    assert_eq!(package.flashcards.len(), 1); // flashcard path unaffected

    let row = h.progress.get("prog-bad-quiz").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);
    assert!(row.error_log.is_empty()); // discards are not errors
}

#[tokio::test]
async fn test_rerun_of_finished_course_skips_all_regeneration() {
    let h = TestHarness::new();

    let mut first = make_job("prog-run-1", fixtures::roadmap_flat());
    first.course_id = Some("course-rerun".to_string());
    let package = h.run(first).await.expect("first run should complete");
    assert_eq!(package.course_id, "course-rerun");

    let llm_calls = h.llm.request_count();
    let embed_calls = h.embedder.call_count();
    let uploads = h.objects.uploads().len();

    let mut second = make_job("prog-run-2", fixtures::roadmap_flat());
    second.course_id = Some("course-rerun".to_string());
    let package = h.run(second).await.expect("second run should complete");

    // Same artifacts, no extra external calls.
    assert_eq!(package.videos.len(), 2);
    assert_eq!(h.llm.request_count(), llm_calls);
    assert_eq!(h.embedder.call_count(), embed_calls);
    assert_eq!(h.objects.uploads().len(), uploads);
    assert_eq!(h.store.list_embeddings("course-rerun").unwrap().len(), 4);
}

#[tokio::test]
async fn test_progress_percentages_never_regress() {
    let h = TestHarness::new();
    h.run(make_job("prog-monotonic", fixtures::roadmap_tree()))
        .await
        .expect("job should complete");

    let events = h.channel.published_events(EVENT_PROGRESS);
    assert!(events.len() > 3);

    let mut last = -1.0;
    for event in &events {
        let pct = event.payload["progressPercentage"]
            .as_f64()
            .expect("percentage in payload");
        assert!(pct >= last, "progress went backwards: {} -> {}", last, pct);
        assert!(pct <= 100.0);
        last = pct;
    }

    let completed = h.channel.published_events(EVENT_COMPLETED);
    assert_eq!(completed[0].payload["progressPercentage"], json!(100.0));
}

#[tokio::test]
async fn test_mix_failure_falls_back_to_concatenation() {
    let h = TestHarness::new();
    h.media.set_fail_mix(true);

    let package = h
        .run(make_job("prog-concat", fixtures::roadmap_flat()))
        .await
        .expect("concat fallback should succeed");

    assert!(h.media.mixed().is_empty());
    assert_eq!(h.media.concatenated().len(), 2);
    for section in &package.sections {
        for subtopic in &section.subtopics {
            assert!(subtopic.audio_path.is_some());
        }
    }

    let row = h.progress.get("prog-concat").unwrap().unwrap();
    assert!(row.error_log.is_empty());
}

#[tokio::test]
async fn test_upload_failure_leaves_subtopic_unpublished() {
    let h = TestHarness::new();
    h.objects.set_fail_all(true);

    let package = h
        .run(make_job("prog-no-upload", fixtures::roadmap_flat()))
        .await
        .expect("upload failures must not fail the job");

    assert!(package.videos.is_empty());
    for section in &package.sections {
        for subtopic in &section.subtopics {
            assert!(subtopic.video_url.is_none());
            // Audio succeeded, so the row parks on the audio rank.
            assert_eq!(subtopic.status, ArtifactStatus::AudioGenerated);
        }
    }

    let row = h.progress.get("prog-no-upload").unwrap().unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);
    let publish_errors: Vec<_> = row
        .error_log
        .iter()
        .filter(|e| e.step == "ArtifactPublishStage")
        .collect();
    assert_eq!(publish_errors.len(), 2);
}
