//! Slide on-screen duration planning.
//!
//! Narration and visuals stay synchronized by deriving slide durations
//! from the transcript: segments are classified into a fixed ordered set
//! of theme groups, slides are divided across groups in proportion to
//! speaking time, and the result is scaled to the probed narration
//! length. Without a usable transcript the narration is divided evenly;
//! without a narration duration every slide gets a fixed span.

use std::cmp::Ordering;

use crate::transcript::TranscriptSegment;

/// Per-slide span when no narration duration is known.
const FALLBACK_SLIDE_SECONDS: f64 = 10.0;

/// Shortest span a slide is ever given. Keeps the encoder away from
/// zero-duration frames on degenerate input.
const MIN_SLIDE_SECONDS: f64 = 1.0;

/// Theme groups in presentation order, with the phrases that put a
/// segment into them. A segment joins the first group that matches;
/// unmatched segments pool into a trailing general group.
const THEME_GROUPS: &[(&str, &[&str])] = &[
    (
        "introduction",
        &["introduction", "welcome", "overview", "getting started", "begin"],
    ),
    (
        "recap",
        &["recap", "summary", "takeaway", "to sum", "conclusion", "remember"],
    ),
    (
        "deep-dive",
        &["deep dive", "in depth", "detail", "internals", "under the hood", "how it works"],
    ),
    (
        "best-practices",
        &["best practice", "tip", "pitfall", "avoid", "recommend"],
    ),
    (
        "preview",
        &["next lesson", "coming up", "preview", "later in this course"],
    ),
    (
        "exercises",
        &["exercise", "practice", "try it", "challenge", "homework"],
    ),
];

/// Plan one on-screen duration per slide.
pub fn plan_slide_durations(
    segments: &[TranscriptSegment],
    slide_count: usize,
    narration_secs: Option<f64>,
) -> Vec<f64> {
    if slide_count == 0 {
        return Vec::new();
    }

    let narration_secs = narration_secs.filter(|d| *d > 0.0);
    let groups = group_durations(segments);
    let spoken_total: f64 = groups.iter().sum();

    if spoken_total <= 0.0 {
        let span = match narration_secs {
            Some(duration) => (duration / slide_count as f64).max(MIN_SLIDE_SECONDS),
            None => FALLBACK_SLIDE_SECONDS,
        };
        return vec![span; slide_count];
    }

    let target_total = narration_secs.unwrap_or(spoken_total);
    let scale = target_total / spoken_total;
    let counts = allocate_slides(&groups, slide_count);

    let mut durations = Vec::with_capacity(slide_count);
    for (group_secs, count) in groups.iter().zip(&counts) {
        if *count == 0 {
            continue;
        }
        let per_slide = group_secs * scale / *count as f64;
        durations.extend(std::iter::repeat(per_slide).take(*count));
    }

    // Groups too small to earn a slide drop out above; stretch what is
    // left back to the narration length.
    let allocated: f64 = durations.iter().sum();
    if allocated > 0.0 && (allocated - target_total).abs() > f64::EPSILON {
        let factor = target_total / allocated;
        for duration in &mut durations {
            *duration *= factor;
        }
    }

    for duration in &mut durations {
        *duration = duration.max(MIN_SLIDE_SECONDS);
    }
    durations
}

/// Total seconds of narration per theme group, general group last.
fn group_durations(segments: &[TranscriptSegment]) -> Vec<f64> {
    let mut groups = vec![0.0; THEME_GROUPS.len() + 1];
    for segment in segments {
        let idx = theme_index(&segment.text).unwrap_or(THEME_GROUPS.len());
        groups[idx] += segment.duration();
    }
    // A transcript can be all timestamps and no measurable spans; fall
    // back to counting segments so grouping still carries information.
    if groups.iter().sum::<f64>() <= 0.0 && !segments.is_empty() {
        for segment in segments {
            let idx = theme_index(&segment.text).unwrap_or(THEME_GROUPS.len());
            groups[idx] += 1.0;
        }
    }
    groups
}

fn theme_index(text: &str) -> Option<usize> {
    let lowered = text.to_lowercase();
    THEME_GROUPS
        .iter()
        .position(|(_, phrases)| phrases.iter().any(|phrase| lowered.contains(phrase)))
}

/// Largest-remainder division of `slide_count` slides across group shares.
fn allocate_slides(shares: &[f64], slide_count: usize) -> Vec<usize> {
    let total: f64 = shares.iter().sum();
    let exact: Vec<f64> = shares
        .iter()
        .map(|share| share / total * slide_count as f64)
        .collect();

    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut leftover = slide_count - counts.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b.partial_cmp(&frac_a).unwrap_or(Ordering::Equal)
    });
    for idx in order {
        if leftover == 0 {
            break;
        }
        counts[idx] += 1;
        leftover -= 1;
    }
    counts
}
