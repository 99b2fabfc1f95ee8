//! Embedding stage: one vector for the course as a whole, one per
//! section, one per subtopic.
//!
//! Each chunk is keyed by a hash of its exact text, so unchanged content
//! across attempts (or across courses sharing material) is never embedded
//! twice. The store enforces the same uniqueness on insert, which covers
//! the race between checking and writing.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::metrics;
use crate::progress::{ProgressTracker, StageBudget};
use crate::roadmap::Roadmap;
use crate::store::{CourseRow, EmbeddingScope, NewEmbedding};

use super::super::error::StageError;
use super::{absorb_unit_error, bounded, read_if_present, SectionPlan, StageContext};

const STAGE: &str = "embeddings";
const STEP: &str = "EmbeddingStage";

/// One unit of text to embed, with the row it should reference.
struct Chunk {
    scope: EmbeddingScope,
    ref_id: Option<String>,
    label: String,
    text: String,
}

pub async fn run_embeddings(
    ctx: &StageContext,
    course: &CourseRow,
    plan: &[SectionPlan],
    roadmap: &Roadmap,
    tracker: &ProgressTracker,
) -> Result<(), StageError> {
    let chunks = build_chunks(ctx, course, plan, roadmap).await;
    let total = chunks.len();

    for (idx, chunk) in chunks.iter().enumerate() {
        let content_hash = format!("{:x}", Sha256::digest(chunk.text.as_bytes()));
        if ctx.store.embedding_exists(&content_hash)? {
            debug!(chunk = %chunk.label, "Embedding already stored, skipping");
            metrics::EMBEDDINGS_REUSED.inc();
            metrics::STAGE_UNITS
                .with_label_values(&[STAGE, "skipped"])
                .inc();
            continue;
        }

        ctx.pace().await;
        let vector = match ctx.embeddings.embed(&chunk.text).await {
            Ok(vector) => vector,
            Err(e) => {
                absorb_unit_error(
                    tracker,
                    STEP,
                    &format!("embedding for {}", chunk.label),
                    StageError::external("embedding", e),
                )
                .await?;
                metrics::STAGE_UNITS
                    .with_label_values(&[STAGE, "failed"])
                    .inc();
                continue;
            }
        };

        let inserted = ctx.store.try_insert_embedding(NewEmbedding {
            course_id: course.id.clone(),
            scope: chunk.scope,
            ref_id: chunk.ref_id.clone(),
            content_hash,
            vector,
            model: ctx.embeddings.model().to_string(),
        })?;
        if !inserted {
            metrics::EMBEDDINGS_REUSED.inc();
        }

        metrics::STAGE_UNITS
            .with_label_values(&[STAGE, "completed"])
            .inc();
        tracker
            .update_step(
                &format!("Embedded {}", chunk.label),
                StageBudget::EMBEDDINGS.at(idx + 1, total),
                None,
                None,
            )
            .await;
    }
    Ok(())
}

/// Course overview first, then sections, then subtopics, every text
/// bounded so oversized decks cannot blow the embedding request.
async fn build_chunks(
    ctx: &StageContext,
    course: &CourseRow,
    plan: &[SectionPlan],
    roadmap: &Roadmap,
) -> Vec<Chunk> {
    let limit = ctx.config.embedding_excerpt_chars;
    let mut chunks = Vec::new();

    let course_text = format!("{}\n{}", course.title, roadmap.outline());
    chunks.push(Chunk {
        scope: EmbeddingScope::Course,
        ref_id: None,
        label: format!("course \"{}\"", course.title),
        text: bounded(&course_text, limit).to_string(),
    });

    for section in plan {
        let mut section_text = section.row.title.clone();
        for subtopic in &section.subtopics {
            section_text.push('\n');
            section_text.push_str(&subtopic.title);
        }
        chunks.push(Chunk {
            scope: EmbeddingScope::Section,
            ref_id: Some(section.row.id.clone()),
            label: format!("section \"{}\"", section.row.title),
            text: bounded(&section_text, limit).to_string(),
        });

        for subtopic in &section.subtopics {
            let paths =
                ctx.workspace
                    .subtopic_paths(&course.id, section.row.position, &subtopic.title);
            let mut subtopic_text = subtopic.title.clone();
            for path in [&paths.deck, &paths.transcript] {
                if let Some(text) = read_if_present(path).await {
                    subtopic_text.push('\n');
                    subtopic_text.push_str(bounded(&text, limit));
                }
            }
            chunks.push(Chunk {
                scope: EmbeddingScope::Subtopic,
                ref_id: Some(subtopic.id.clone()),
                label: format!("subtopic \"{}\"", subtopic.title),
                text: bounded(&subtopic_text, limit).to_string(),
            });
        }
    }
    chunks
}
