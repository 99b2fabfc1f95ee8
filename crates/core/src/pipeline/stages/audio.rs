//! Audio synthesis stage: transcript segments become narration clips,
//! clips become one time-aligned track per subtopic.
//!
//! Failures here are deliberately soft. A segment that fails or times out
//! is skipped, a subtopic whose whole synthesis window expires is marked
//! `audio_generation_failed`, and in both cases the pipeline moves on;
//! a silent video beats no video.

use std::time::Duration;

use tracing::{debug, warn};

use crate::media::NarrationClip;
use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::store::{ArtifactStatus, CourseRow, SubtopicArtifactUpdate};
use crate::transcript::{parse_transcript, TranscriptSegment};

use super::super::error::StageError;
use super::super::workspace::SubtopicPaths;
use super::{absorb_unit_error, read_if_present, total_subtopics, SectionPlan, StageContext};

const STAGE: &str = "audio";
const STEP: &str = "AudioSynthesisStage";

pub async fn run_audio_synthesis(
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
            // Rows were snapshotted at plan time, so a rank at or past the
            // audio branch means a previous attempt already settled it.
            if !subtopic.status.advances_to(ArtifactStatus::AudioGenerated) {
                debug!(subtopic = %subtopic.title, status = subtopic.status.as_str(), "Audio already settled, skipping");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let paths =
                ctx.workspace
                    .subtopic_paths(&course.id, section.row.position, &subtopic.title);

            if tokio::fs::try_exists(&paths.narration).await? {
                ctx.store.update_subtopic_artifacts(
                    &subtopic.id,
                    &SubtopicArtifactUpdate {
                        audio_path: Some(paths.narration.display().to_string()),
                        status: Some(ArtifactStatus::AudioGenerated),
                        ..Default::default()
                    },
                )?;
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let transcript = match read_if_present(&paths.transcript).await {
                Some(text) => text,
                None => {
                    // The content stage already logged why this is missing.
                    debug!(subtopic = %subtopic.title, "No transcript, skipping audio");
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "skipped"])
                        .inc();
                    continue;
                }
            };

            let segments = parse_transcript(&transcript);
            if segments.is_empty() {
                absorb_unit_error(
                    tracker,
                    STEP,
                    &format!("narration for \"{}\"", subtopic.title),
                    StageError::data("transcript has no usable segments"),
                )
                .await?;
                mark_audio_failed(ctx, &subtopic.id)?;
                continue;
            }

            tokio::fs::create_dir_all(&paths.clips_dir).await?;

            let budget = Duration::from_secs(ctx.config.subtopic_audio_timeout_secs);
            let outcome =
                tokio::time::timeout(budget, synthesize_and_combine(ctx, &segments, &paths)).await;

            match outcome {
                Ok(Ok(())) => {
                    ctx.store.update_subtopic_artifacts(
                        &subtopic.id,
                        &SubtopicArtifactUpdate {
                            audio_path: Some(paths.narration.display().to_string()),
                            status: Some(ArtifactStatus::AudioGenerated),
                            ..Default::default()
                        },
                    )?;
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "completed"])
                        .inc();
                    tracker
                        .update_step(
                            &format!("Synthesized narration for \"{}\"", subtopic.title),
                            StageBudget::AUDIO.at(done, total),
                            Some(section_idx as u32),
                            Some(sub_idx as u32),
                        )
                        .await;
                }
                Ok(Err(e)) => {
                    absorb_unit_error(
                        tracker,
                        STEP,
                        &format!("narration for \"{}\"", subtopic.title),
                        e,
                    )
                    .await?;
                    mark_audio_failed(ctx, &subtopic.id)?;
                }
                Err(_) => {
                    absorb_unit_error(
                        tracker,
                        STEP,
                        &format!("narration for \"{}\"", subtopic.title),
                        StageError::external(
                            "speech",
                            format!(
                                "subtopic audio timed out after {}s",
                                ctx.config.subtopic_audio_timeout_secs
                            ),
                        ),
                    )
                    .await?;
                    mark_audio_failed(ctx, &subtopic.id)?;
                }
            }
        }
    }
    Ok(())
}

fn mark_audio_failed(ctx: &StageContext, subtopic_id: &str) -> Result<(), StageError> {
    ctx.store.update_subtopic_artifacts(
        subtopic_id,
        &SubtopicArtifactUpdate {
            status: Some(ArtifactStatus::AudioGenerationFailed),
            ..Default::default()
        },
    )?;
    metrics::STAGE_UNITS
        .with_label_values(&[STAGE, "failed"])
        .inc();
    Ok(())
}

/// Synthesize every segment, then fold the surviving clips into one
/// offset-aligned track. Segment failures are skipped; only a fully
/// empty result or a failed combination errors out.
async fn synthesize_and_combine(
    ctx: &StageContext,
    segments: &[TranscriptSegment],
    paths: &SubtopicPaths,
) -> Result<(), StageError> {
    let segment_budget = Duration::from_secs(ctx.config.segment_timeout_secs);
    let mut clips = Vec::with_capacity(segments.len());

    for (idx, segment) in segments.iter().enumerate() {
        ctx.pace().await;
        match tokio::time::timeout(segment_budget, ctx.speech.synthesize(&segment.text)).await {
            Ok(Ok(bytes)) => {
                let clip_path = paths.clips_dir.join(format!("segment_{idx:03}.mp3"));
                tokio::fs::write(&clip_path, &bytes).await?;
                clips.push(NarrationClip::new(clip_path, segment.start_offset_seconds));
            }
            Ok(Err(e)) => {
                warn!(segment = idx, error = %e, "Segment synthesis failed, skipping");
            }
            Err(_) => {
                warn!(
                    segment = idx,
                    timeout_secs = ctx.config.segment_timeout_secs,
                    "Segment synthesis timed out, skipping"
                );
            }
        }
    }

    if clips.is_empty() {
        return Err(StageError::external(
            "speech",
            "every narration segment failed",
        ));
    }

    if let Err(e) = ctx.media.mix_narration(&clips, &paths.narration).await {
        warn!(error = %e, "Narration mix failed, falling back to concatenation");
        ctx.media
            .concat_narration(&clips, &paths.narration)
            .await
            .map_err(|e| StageError::subprocess("ffmpeg", e))?;
    }
    Ok(())
}
