//! Video compile stage: slide images plus optional narration become one
//! H.264 file per subtopic.
//!
//! Slide durations come from the timing planner, which prefers
//! transcript theme groups, then an even split over probed narration,
//! then a fixed per-slide fallback. A missing narration track is fine;
//! missing slides are not, and fail just that subtopic.

use tracing::{debug, warn};

use crate::media::SlideFrame;
use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::store::CourseRow;
use crate::transcript::parse_transcript;

use super::super::error::StageError;
use super::super::timing::plan_slide_durations;
use super::{
    absorb_unit_error, collect_slide_images, read_if_present, total_subtopics, SectionPlan,
    StageContext,
};

const STAGE: &str = "video";
const STEP: &str = "VideoCompileStage";

pub async fn run_video_compile(
    ctx: &StageContext,
    course: &CourseRow,
    plan: &[SectionPlan],
    tracker: &ProgressTracker,
) -> Result<(), StageError> {
    let total = total_subtopics(plan);
    let mut done = 0usize;

    for (section_idx, section) in plan.iter().enumerate() {
        for (sub_idx, subtopic) in section.subtopics.iter().enumerate() {
            done += 1;
            let paths =
                ctx.workspace
                    .subtopic_paths(&course.id, section.row.position, &subtopic.title);

            if tokio::fs::try_exists(&paths.video).await? {
                debug!(subtopic = %subtopic.title, "Video already compiled, skipping");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let images = collect_slide_images(&paths.slides_dir).await?;
            if images.is_empty() {
                absorb_unit_error(
                    tracker,
                    STEP,
                    &format!("video for \"{}\"", subtopic.title),
                    StageError::data("no slide images to compile"),
                )
                .await?;
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "failed"])
                    .inc();
                continue;
            }

            let narration = tokio::fs::try_exists(&paths.narration)
                .await?
                .then_some(paths.narration.as_path());
            let narration_secs = match narration {
                Some(path) => match ctx.media.probe(path).await {
                    Ok(info) => Some(info.duration_secs),
                    Err(e) => {
                        warn!(error = %e, "Narration probe failed, using transcript timing");
                        None
                    }
                },
                None => None,
            };

            let segments = match read_if_present(&paths.transcript).await {
                Some(text) => parse_transcript(&text),
                None => Vec::new(),
            };
            let durations = plan_slide_durations(&segments, images.len(), narration_secs);
            let frames: Vec<SlideFrame> = images
                .into_iter()
                .zip(durations)
                .map(|(path, duration)| SlideFrame::new(path, duration))
                .collect();

            match ctx.media.compile_slideshow(&frames, narration, &paths.video).await {
                Ok(()) => {
                    metrics::VIDEOS_COMPILED.inc();
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "completed"])
                        .inc();
                    tracker
                        .update_step(
                            &format!("Compiled video for \"{}\"", subtopic.title),
                            StageBudget::VIDEO.at(done, total),
                            Some(section_idx as u32),
                            Some(sub_idx as u32),
                        )
                        .await;
                }
                Err(e) => {
                    absorb_unit_error(
                        tracker,
                        STEP,
                        &format!("video for \"{}\"", subtopic.title),
                        StageError::subprocess("ffmpeg", e),
                    )
                    .await?;
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "failed"])
                        .inc();
                }
            }
        }
    }
    Ok(())
}
