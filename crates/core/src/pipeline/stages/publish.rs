//! Artifact publish stage: compiled videos go to object storage and the
//! subtopic rows pick up their public URLs.
//!
//! Upload failures are recoverable per subtopic; the row keeps its local
//! paths and the next attempt re-publishes whatever is still missing.

use tracing::debug;

use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::store::{ArtifactStatus, CourseRow, SubtopicArtifactUpdate};

use super::super::error::StageError;
use super::{absorb_unit_error, total_subtopics, SectionPlan, StageContext};

const STAGE: &str = "publish";
const STEP: &str = "ArtifactPublishStage";

pub async fn run_artifact_publish(
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
            if subtopic.video_url.is_some() {
                debug!(subtopic = %subtopic.title, "Video already published, skipping");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let paths =
                ctx.workspace
                    .subtopic_paths(&course.id, section.row.position, &subtopic.title);
            if !tokio::fs::try_exists(&paths.video).await? {
                debug!(subtopic = %subtopic.title, "No local video to publish");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let key = ctx
                .workspace
                .video_key(&course.id, section.row.position, &subtopic.title);
            let bytes = tokio::fs::read(&paths.video).await?;

            ctx.pace().await;
            match ctx.objects.put(&key, bytes, "video/mp4", true).await {
                Ok(url) => {
                    ctx.store.update_subtopic_artifacts(
                        &subtopic.id,
                        &SubtopicArtifactUpdate {
                            video_url: Some(url),
                            status: Some(ArtifactStatus::Completed),
                            ..Default::default()
                        },
                    )?;
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "completed"])
                        .inc();
                    tracker
                        .update_step(
                            &format!("Published video for \"{}\"", subtopic.title),
                            StageBudget::PUBLISH.at(done, total),
                            Some(section_idx as u32),
                            Some(sub_idx as u32),
                        )
                        .await;
                }
                Err(e) => {
                    absorb_unit_error(
                        tracker,
                        STEP,
                        &format!("upload for \"{}\"", subtopic.title),
                        StageError::external("storage", e),
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
