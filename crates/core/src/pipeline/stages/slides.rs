//! Slide render stage: one image per slide, whatever it takes.
//!
//! The degradation ladder goes standard invocation, defensive invocation,
//! generated placeholder images, and finally a plain-text note. Only the
//! first two touch the real renderer; the job never aborts on render
//! trouble, it just gets uglier.

use std::path::Path;

use tracing::{debug, warn};

use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::renderer::{count_slides, ensure_front_matter, RenderMode};
use crate::store::CourseRow;

use super::super::error::StageError;
use super::{
    absorb_unit_error, collect_slide_images, read_if_present, total_subtopics, SectionPlan,
    StageContext,
};

const STAGE: &str = "render";
const STEP: &str = "SlideRenderStage";

pub async fn run_slide_render(
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
                debug!(subtopic = %subtopic.title, "Video already compiled, skipping render");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }
            if !collect_slide_images(&paths.slides_dir).await?.is_empty() {
                debug!(subtopic = %subtopic.title, "Slides already rendered, skipping");
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let markdown = match read_if_present(&paths.deck).await {
                Some(text) => text,
                None => {
                    debug!(subtopic = %subtopic.title, "No deck, skipping render");
                    metrics::STAGE_UNITS
                        .with_label_values(&[STAGE, "skipped"])
                        .inc();
                    continue;
                }
            };

            let prepared = ensure_front_matter(&markdown, &ctx.config.deck_theme);
            if prepared != markdown {
                tokio::fs::write(&paths.deck, &prepared).await?;
            }
            tokio::fs::create_dir_all(&paths.slides_dir).await?;

            let result = match render_with_ladder(ctx, &paths.deck, &paths.slides_dir).await {
                Ok(()) => "completed",
                Err(e) => {
                    absorb_unit_error(
                        tracker,
                        STEP,
                        &format!("slides for \"{}\"", subtopic.title),
                        e,
                    )
                    .await?;
                    degrade_to_placeholders(ctx, &subtopic.title, &prepared, &paths.slides_dir)
                        .await?;
                    "degraded"
                }
            };

            metrics::STAGE_UNITS.with_label_values(&[STAGE, result]).inc();
            tracker
                .update_step(
                    &format!("Rendered slides for \"{}\"", subtopic.title),
                    StageBudget::RENDER.at(done, total),
                    Some(section_idx as u32),
                    Some(sub_idx as u32),
                )
                .await;
        }
    }
    Ok(())
}

/// Standard invocation, then a defensive one with extra sandboxing
/// disabled. Each attempt races an outer timer on top of the renderer's
/// own subprocess timeout.
async fn render_with_ladder(
    ctx: &StageContext,
    deck: &Path,
    out_dir: &Path,
) -> Result<(), StageError> {
    let outer = std::time::Duration::from_secs(ctx.config.outer_render_timeout_secs);
    let mut last_error = String::new();

    for mode in [RenderMode::Standard, RenderMode::Defensive] {
        match tokio::time::timeout(outer, ctx.renderer.render(deck, out_dir, mode)).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => {
                warn!(?mode, error = %e, "Slide render attempt failed");
                last_error = e.to_string();
            }
            Err(_) => {
                warn!(?mode, timeout_secs = ctx.config.outer_render_timeout_secs, "Slide render attempt timed out");
                last_error = format!(
                    "timed out after {}s",
                    ctx.config.outer_render_timeout_secs
                );
            }
        }
    }
    Err(StageError::subprocess(
        "marp",
        format!("standard and defensive invocations failed: {last_error}"),
    ))
}

/// Fill the slides directory with one placeholder image per planned
/// slide; if even that is impossible, leave a note explaining the gap.
async fn degrade_to_placeholders(
    ctx: &StageContext,
    title: &str,
    markdown: &str,
    slides_dir: &Path,
) -> Result<(), StageError> {
    let count = count_slides(markdown);
    for idx in 1..=count {
        let output = slides_dir.join(format!("slide.{idx:03}.png"));
        if let Err(e) = ctx.media.render_placeholder(title, &output).await {
            warn!(error = %e, "Placeholder generation failed, writing text note");
            let note = slides_dir.join("slides_unavailable.txt");
            tokio::fs::write(
                &note,
                format!("Slide images could not be generated for \"{title}\".\n"),
            )
            .await?;
            return Ok(());
        }
    }
    Ok(())
}
