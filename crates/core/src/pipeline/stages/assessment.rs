//! Assessment stage: one flashcard and one multiple-choice quiz per
//! section, both generated from the section's own content.
//!
//! Responses the model gets wrong (bad JSON, wrong question count, out of
//! range answer index) are discarded for that section without a retry;
//! the course simply ships without that assessment.

use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmError};
use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::store::{CourseRow, NewFlashcard, NewQuiz, NewQuizQuestion};

use super::super::error::StageError;
use super::super::prompts;
use super::super::types::{FlashcardPayload, QuizPayload};
use super::{bounded, read_if_present, SectionPlan, StageContext};

const STAGE: &str = "assessment";

pub async fn run_assessment(
    ctx: &StageContext,
    course: &CourseRow,
    plan: &[SectionPlan],
    tracker: &ProgressTracker,
) -> Result<(), StageError> {
    let existing_quizzes = ctx.store.list_quizzes(&course.id)?;
    let existing_flashcards = ctx.store.list_flashcards(&course.id)?;
    let total = plan.len();

    for (section_idx, section) in plan.iter().enumerate() {
        let has_quiz = existing_quizzes
            .iter()
            .any(|q| q.section_id == section.row.id);
        let has_flashcard = existing_flashcards
            .iter()
            .any(|f| f.section_id == section.row.id);
        if has_quiz && has_flashcard {
            debug!(section = %section.row.title, "Assessments already generated, skipping");
            metrics::STAGE_UNITS
                .with_label_values(&[STAGE, "skipped"])
                .inc();
            continue;
        }

        let content = section_excerpt(ctx, course, section).await;
        if content.trim().is_empty() {
            warn!(section = %section.row.title, "No content to assess, skipping");
            metrics::STAGE_UNITS
                .with_label_values(&[STAGE, "skipped"])
                .inc();
            continue;
        }

        let mut discarded = false;

        if !has_flashcard {
            ctx.pace().await;
            let request =
                CompletionRequest::new(prompts::flashcard_prompt(&section.row.title, &content))
                    .with_system(prompts::SYSTEM_PROMPT);
            match ctx.completions.generate_json::<FlashcardPayload>(request).await {
                Ok(payload) => match payload.validate() {
                    Ok(()) => {
                        ctx.store.insert_flashcard(NewFlashcard {
                            course_id: course.id.clone(),
                            section_id: section.row.id.clone(),
                            front: payload.front,
                            back: payload.back,
                        })?;
                    }
                    Err(reason) => {
                        warn!(section = %section.row.title, %reason, "Discarding invalid flashcard");
                        discarded = true;
                    }
                },
                Err(e) => {
                    note_discard(&section.row.title, "flashcard", &e);
                    discarded = true;
                }
            }
        }

        if !has_quiz {
            ctx.pace().await;
            let request = CompletionRequest::new(prompts::quiz_prompt(&section.row.title, &content))
                .with_system(prompts::SYSTEM_PROMPT)
                .with_max_tokens(4096);
            match ctx.completions.generate_json::<QuizPayload>(request).await {
                Ok(payload) => match payload.validate() {
                    Ok(()) => {
                        let title = payload
                            .title
                            .unwrap_or_else(|| format!("{} Quiz", section.row.title));
                        let questions = payload
                            .questions
                            .into_iter()
                            .map(|q| NewQuizQuestion {
                                question: q.question,
                                options: q.options,
                                correct_index: q.correct_index,
                            })
                            .collect();
                        ctx.store.insert_quiz(NewQuiz {
                            course_id: course.id.clone(),
                            section_id: section.row.id.clone(),
                            title,
                            questions,
                        })?;
                    }
                    Err(reason) => {
                        warn!(section = %section.row.title, %reason, "Discarding invalid quiz");
                        discarded = true;
                    }
                },
                Err(e) => {
                    note_discard(&section.row.title, "quiz", &e);
                    discarded = true;
                }
            }
        }

        let result = if discarded { "failed" } else { "completed" };
        metrics::STAGE_UNITS.with_label_values(&[STAGE, result]).inc();
        tracker
            .update_step(
                &format!("Generated assessments for \"{}\"", section.row.title),
                StageBudget::ASSESSMENT.at(section_idx + 1, total),
                Some(section_idx as u32),
                None,
            )
            .await;
    }
    Ok(())
}

/// A malformed or failed completion costs this section its assessment and
/// nothing more. Whatever survives the service's own retries is treated
/// the same as bad JSON.
fn note_discard(section_title: &str, kind: &str, error: &LlmError) {
    warn!(section = %section_title, kind, error = %error, "Assessment generation failed, discarding");
}

/// Bounded markdown+transcript excerpt for one section, in subtopic
/// order.
async fn section_excerpt(ctx: &StageContext, course: &CourseRow, section: &SectionPlan) -> String {
    let limit = ctx.config.assessment_excerpt_chars;
    let mut content = String::new();
    for subtopic in &section.subtopics {
        if content.chars().count() >= limit {
            break;
        }
        let paths =
            ctx.workspace
                .subtopic_paths(&course.id, section.row.position, &subtopic.title);
        for path in [&paths.deck, &paths.transcript] {
            if let Some(text) = read_if_present(path).await {
                content.push_str(bounded(&text, limit));
                content.push('\n');
            }
        }
    }
    bounded(&content, limit).to_string()
}
