//! Text content stage: one slide deck and one timestamped transcript per
//! subtopic.
//!
//! Both artifacts land in the workspace and their paths on the subtopic
//! row. A subtopic that already has both files is skipped, which is what
//! makes a retried job cheap; a transcript surviving without its deck
//! drives deck generation instead, so slides match narration that already
//! exists.

use tracing::debug;

use crate::llm::CompletionRequest;
use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::roadmap::Roadmap;
use crate::store::{ArtifactStatus, CourseRow, SubtopicArtifactUpdate};

use super::super::error::StageError;
use super::super::prompts;
use super::{absorb_unit_error, read_if_present, total_subtopics, SectionPlan, StageContext};

const STAGE: &str = "text";
const STEP: &str = "TextContentStage";

pub async fn run_text_content(
    ctx: &StageContext,
    course: &CourseRow,
    plan: &[SectionPlan],
    roadmap: &Roadmap,
    tracker: &ProgressTracker,
) -> Result<(), StageError> {
    let outline = roadmap.outline();
    let total = total_subtopics(plan);
    let mut done = 0usize;

    for (section_idx, section) in plan.iter().enumerate() {
        for (sub_idx, subtopic) in section.subtopics.iter().enumerate() {
            done += 1;
            let paths =
                ctx.workspace
                    .subtopic_paths(&course.id, section.row.position, &subtopic.title);
            if let Some(parent) = paths.deck.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let existing_deck = read_if_present(&paths.deck).await;
            let existing_transcript = read_if_present(&paths.transcript).await;

            if existing_deck.is_some() && existing_transcript.is_some() {
                debug!(subtopic = %subtopic.title, "Content already present, skipping");
                // A crash between file write and row update leaves the row
                // behind the filesystem; re-assert the references.
                ctx.store.update_subtopic_artifacts(
                    &subtopic.id,
                    &SubtopicArtifactUpdate {
                        markdown_path: Some(paths.deck.display().to_string()),
                        transcript_path: Some(paths.transcript.display().to_string()),
                        status: Some(ArtifactStatus::TranscriptGenerated),
                        ..Default::default()
                    },
                )?;
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "skipped"])
                    .inc();
                continue;
            }

            let deck_markdown = match existing_deck {
                Some(deck) => deck,
                None => {
                    let prompt = match &existing_transcript {
                        Some(transcript) => prompts::deck_from_transcript_prompt(
                            &section.row.title,
                            &subtopic.title,
                            transcript,
                        ),
                        None => {
                            let previous = sub_idx
                                .checked_sub(1)
                                .and_then(|i| section.subtopics.get(i))
                                .map(|s| s.title.as_str());
                            let next = section
                                .subtopics
                                .get(sub_idx + 1)
                                .map(|s| s.title.as_str());
                            prompts::deck_prompt(
                                &section.row.title,
                                &subtopic.title,
                                &outline,
                                previous,
                                next,
                            )
                        }
                    };

                    ctx.pace().await;
                    let request =
                        CompletionRequest::new(prompt).with_system(prompts::SYSTEM_PROMPT);
                    match ctx.completions.generate(request).await {
                        Ok(text) => {
                            tokio::fs::write(&paths.deck, &text).await?;
                            ctx.store.update_subtopic_artifacts(
                                &subtopic.id,
                                &SubtopicArtifactUpdate {
                                    markdown_path: Some(paths.deck.display().to_string()),
                                    status: Some(ArtifactStatus::MarkdownGenerated),
                                    ..Default::default()
                                },
                            )?;
                            text
                        }
                        Err(e) => {
                            absorb_unit_error(
                                tracker,
                                STEP,
                                &format!("deck for \"{}\"", subtopic.title),
                                StageError::external("completion", e),
                            )
                            .await?;
                            metrics::STAGE_UNITS
                                .with_label_values(&[STAGE, "failed"])
                                .inc();
                            continue;
                        }
                    }
                }
            };

            if existing_transcript.is_none() {
                ctx.pace().await;
                let request = CompletionRequest::new(prompts::transcript_prompt(
                    &subtopic.title,
                    &deck_markdown,
                ))
                .with_system(prompts::SYSTEM_PROMPT);
                match ctx.completions.generate(request).await {
                    Ok(text) => {
                        tokio::fs::write(&paths.transcript, &text).await?;
                        ctx.store.update_subtopic_artifacts(
                            &subtopic.id,
                            &SubtopicArtifactUpdate {
                                transcript_path: Some(paths.transcript.display().to_string()),
                                status: Some(ArtifactStatus::TranscriptGenerated),
                                ..Default::default()
                            },
                        )?;
                    }
                    Err(e) => {
                        absorb_unit_error(
                            tracker,
                            STEP,
                            &format!("transcript for \"{}\"", subtopic.title),
                            StageError::external("completion", e),
                        )
                        .await?;
                        metrics::STAGE_UNITS
                            .with_label_values(&[STAGE, "failed"])
                            .inc();
                        continue;
                    }
                }
            }

            metrics::STAGE_UNITS
                .with_label_values(&[STAGE, "completed"])
                .inc();
            tracker
                .update_step(
                    &format!("Generated content for \"{}\"", subtopic.title),
                    StageBudget::TEXT.at(done, total),
                    Some(section_idx as u32),
                    Some(sub_idx as u32),
                )
                .await;
        }
    }
    Ok(())
}
