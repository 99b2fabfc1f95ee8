//! Prompt construction for the completion service.
//!
//! Prompts carry course context (roadmap outline, neighboring subtopics)
//! so consecutive lessons read as one course instead of isolated essays.
//! JSON-producing prompts spell out the exact schema; responses that still
//! fail to parse are discarded by the caller.

/// System prompt shared by all course-content completions.
pub const SYSTEM_PROMPT: &str = "You are an expert course author. You write clear, accurate, \
well-structured teaching material for online video courses. Follow the requested output format \
exactly and do not add commentary around it.";

/// One-sentence continuity hints about the surrounding subtopics.
pub fn continuity_lines(previous: Option<&str>, next: Option<&str>) -> String {
    let mut lines = String::new();
    if let Some(title) = previous {
        lines.push_str(&format!(
            "The previous lesson covered \"{}\"; build on it without repeating it.\n",
            title
        ));
    }
    if let Some(title) = next {
        lines.push_str(&format!(
            "The next lesson will cover \"{}\"; you may briefly set it up.\n",
            title
        ));
    }
    lines
}

/// Prompt for a subtopic's slide deck, written fresh.
pub fn deck_prompt(
    section_title: &str,
    subtopic_title: &str,
    outline: &str,
    previous: Option<&str>,
    next: Option<&str>,
) -> String {
    format!(
        "Write a slide deck in Marp markdown for one course lesson.\n\
         \n\
         Course outline:\n{outline}\n\
         Section: {section_title}\n\
         Lesson: {subtopic_title}\n\
         {continuity}\
         \n\
         Requirements:\n\
         - 4 to 8 slides separated by `---` lines\n\
         - each slide has one `#` or `##` heading and at most 5 short bullet points\n\
         - content must be specific to this lesson, not the whole section\n\
         - output only the markdown, no surrounding commentary",
        outline = outline.trim_end(),
        section_title = section_title,
        subtopic_title = subtopic_title,
        continuity = continuity_lines(previous, next),
    )
}

/// Prompt for a slide deck derived from an already-generated transcript,
/// used when a previous partial run left narration behind.
pub fn deck_from_transcript_prompt(
    section_title: &str,
    subtopic_title: &str,
    transcript: &str,
) -> String {
    format!(
        "Write a slide deck in Marp markdown that matches this existing narration. The slides \
         will be shown while the narration plays, so follow its order and cover exactly what it \
         says.\n\
         \n\
         Section: {section_title}\n\
         Lesson: {subtopic_title}\n\
         \n\
         Narration transcript:\n{transcript}\n\
         \n\
         Requirements:\n\
         - slides separated by `---` lines, one heading each, short bullet points\n\
         - output only the markdown, no surrounding commentary",
        section_title = section_title,
        subtopic_title = subtopic_title,
        transcript = transcript.trim_end(),
    )
}

/// Prompt for the narration transcript of a deck.
pub fn transcript_prompt(subtopic_title: &str, deck_markdown: &str) -> String {
    format!(
        "Write a timestamped transcript narrating this slide deck for the lesson \
         \"{subtopic_title}\".\n\
         \n\
         Slide deck:\n{deck}\n\
         \n\
         Requirements:\n\
         - one line per spoken sentence, each starting with a `[MM:SS]` timestamp\n\
         - timestamps increase monotonically from [00:00] and leave a natural speaking pace\n\
         - narrate the slides in order; do not mention slide numbers or the word \"slide\"\n\
         - output only the transcript lines",
        subtopic_title = subtopic_title,
        deck = deck_markdown.trim_end(),
    )
}

/// Prompt for a section's multiple-choice quiz.
pub fn quiz_prompt(section_title: &str, content: &str) -> String {
    format!(
        "Create a multiple-choice quiz for the course section \"{section_title}\" from the \
         material below.\n\
         \n\
         Material:\n{content}\n\
         \n\
         Respond with JSON only, exactly this shape:\n\
         {{\"title\": string, \"questions\": [{{\"question\": string, \"options\": [string, \
         string, string, string], \"correctIndex\": number}}]}}\n\
         \n\
         Requirements:\n\
         - between 5 and 8 questions\n\
         - exactly 4 options per question, one correct\n\
         - correctIndex is the 0-based index of the correct option",
        section_title = section_title,
        content = content.trim_end(),
    )
}

/// Prompt for a section's flashcard.
pub fn flashcard_prompt(section_title: &str, content: &str) -> String {
    format!(
        "Create one flashcard capturing the core idea of the course section \
         \"{section_title}\" from the material below.\n\
         \n\
         Material:\n{content}\n\
         \n\
         Respond with JSON only, exactly this shape:\n\
         {{\"front\": string, \"back\": string}}\n\
         \n\
         The front is a short question, the back a concise answer.",
        section_title = section_title,
        content = content.trim_end(),
    )
}
