//! Transcript parsing.
//!
//! Two line formats are accepted:
//!
//! - subtitle blocks with explicit ranges:
//!   `00:00:04,500 --> 00:00:09,000` followed by text lines
//! - simple timecoded lines: `[MM:SS] text` (or `[HH:MM:SS] text`), where a
//!   segment's span defaults to ~3 seconds, clamped to the next segment's
//!   start when that comes sooner.
//!
//! Unparseable lines are skipped; a transcript that yields zero segments is
//! the caller's signal that narration cannot be synthesized.

use regex_lite::Regex;

use super::types::TranscriptSegment;

/// Default span for `[MM:SS]`-style lines, which carry no end time.
const DEFAULT_SEGMENT_SECONDS: f64 = 3.0;

/// Parse a transcript into ordered segments.
pub fn parse_transcript(text: &str) -> Vec<TranscriptSegment> {
    let segments = if text.contains("-->") {
        parse_subtitle_blocks(text)
    } else {
        parse_timecoded_lines(text)
    };
    let mut segments = segments;
    segments.sort_by(|a, b| {
        a.start_offset_seconds
            .partial_cmp(&b.start_offset_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    segments
}

/// End of the last segment, in seconds. Zero for an empty transcript.
pub fn total_duration(segments: &[TranscriptSegment]) -> f64 {
    segments
        .iter()
        .map(|s| s.end_offset_seconds)
        .fold(0.0, f64::max)
}

fn parse_subtitle_blocks(text: &str) -> Vec<TranscriptSegment> {
    let range_re = match Regex::new(
        r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})",
    ) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut segments = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(caps) = range_re.captures(line) else {
            continue;
        };
        let start = hms_to_seconds(&caps, 1);
        let end = hms_to_seconds(&caps, 5);

        // Text runs until the next blank line; multi-line cues join with spaces.
        let mut cue = String::new();
        while let Some(text_line) = lines.peek() {
            let trimmed = text_line.trim();
            if trimmed.is_empty() {
                break;
            }
            if !cue.is_empty() {
                cue.push(' ');
            }
            cue.push_str(trimmed);
            lines.next();
        }

        if !cue.is_empty() && end > start {
            segments.push(TranscriptSegment::new(start, end, cue));
        }
    }
    segments
}

fn parse_timecoded_lines(text: &str) -> Vec<TranscriptSegment> {
    let line_re = match Regex::new(r"^\[(\d{1,2}):(\d{2})(?::(\d{2}))?\]\s*(.+)$") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut starts_and_text: Vec<(f64, String)> = Vec::new();
    for line in text.lines() {
        let Some(caps) = line_re.captures(line.trim()) else {
            continue;
        };
        let first: f64 = caps[1].parse().unwrap_or(0.0);
        let second: f64 = caps[2].parse().unwrap_or(0.0);
        let start = match caps.get(3) {
            // [HH:MM:SS]
            Some(secs) => first * 3600.0 + second * 60.0 + secs.as_str().parse().unwrap_or(0.0),
            // [MM:SS]
            None => first * 60.0 + second,
        };
        let cue = caps[4].trim().to_string();
        if !cue.is_empty() {
            starts_and_text.push((start, cue));
        }
    }

    starts_and_text.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut segments = Vec::with_capacity(starts_and_text.len());
    for idx in 0..starts_and_text.len() {
        let (start, ref cue) = starts_and_text[idx];
        let mut span = DEFAULT_SEGMENT_SECONDS;
        if let Some((next_start, _)) = starts_and_text.get(idx + 1) {
            let gap = next_start - start;
            if gap > 0.0 {
                span = span.min(gap);
            }
        }
        segments.push(TranscriptSegment::new(start, start + span, cue.clone()));
    }
    segments
}

fn hms_to_seconds(caps: &regex_lite::Captures<'_>, first_group: usize) -> f64 {
    let hours: f64 = caps[first_group].parse().unwrap_or(0.0);
    let minutes: f64 = caps[first_group + 1].parse().unwrap_or(0.0);
    let seconds: f64 = caps[first_group + 2].parse().unwrap_or(0.0);
    let millis: f64 = caps[first_group + 3].parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subtitle_blocks() {
        let text = "1\n00:00:00,000 --> 00:00:04,500\nWelcome to the course.\n\n2\n00:00:04,500 --> 00:00:09,000\nLet's begin\nwith the basics.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_offset_seconds, 0.0);
        assert_eq!(segments[0].end_offset_seconds, 4.5);
        assert_eq!(segments[0].text, "Welcome to the course.");
        assert_eq!(segments[1].text, "Let's begin with the basics.");
        assert_eq!(total_duration(&segments), 9.0);
    }

    #[test]
    fn test_parse_timecoded_lines_with_default_span() {
        let text = "[00:00] Hello there.\n[00:10] Ten seconds in.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end_offset_seconds, 3.0);
        assert_eq!(segments[1].start_offset_seconds, 10.0);
        assert_eq!(segments[1].end_offset_seconds, 13.0);
    }

    #[test]
    fn test_default_span_clamped_to_next_start() {
        let text = "[00:00] Quick one.\n[00:02] Right behind it.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments[0].end_offset_seconds, 2.0);
        assert_eq!(segments[1].end_offset_seconds, 5.0);
    }

    #[test]
    fn test_hour_timecodes() {
        let text = "[01:02:03] An hour in.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments[0].start_offset_seconds, 3723.0);
    }

    #[test]
    fn test_out_of_order_lines_are_sorted() {
        let text = "[00:30] Later.\n[00:05] Earlier.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments[0].text, "Earlier.");
        assert_eq!(segments[1].text, "Later.");
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let text = "intro without timecode\n[00:05] Real segment.\n[broken] nope\n";
        let segments = parse_transcript(text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Real segment.");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_transcript("").is_empty());
        assert_eq!(total_duration(&[]), 0.0);
    }

    #[test]
    fn test_subtitle_block_with_dot_millis() {
        let text = "00:00:01.250 --> 00:00:02.750\nDot separated.\n";
        let segments = parse_transcript(text);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start_offset_seconds - 1.25).abs() < 1e-9);
        assert!((segments[0].end_offset_seconds - 2.75).abs() < 1e-9);
    }
}
