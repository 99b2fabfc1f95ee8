//! Roadmap data types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while normalizing a roadmap.
#[derive(Debug, Error)]
pub enum RoadmapError {
    /// The input contained no usable sections.
    #[error("Roadmap has no sections")]
    Empty,

    /// The input was neither a section tree nor a flat title map.
    #[error("Unrecognized roadmap shape: {reason}")]
    InvalidShape { reason: String },
}

impl RoadmapError {
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }
}

/// One section of a roadmap: a title plus its ordered subtopic titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapSection {
    pub title: String,
    pub subtopics: Vec<String>,
}

/// A normalized course roadmap.
///
/// Built once per job run and immutable thereafter; section and subtopic
/// order is the authoring order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roadmap {
    /// Course title when the source tree carried one.
    pub course_title: Option<String>,
    pub sections: Vec<RoadmapSection>,
}

impl Roadmap {
    /// Total number of subtopics across all sections.
    pub fn subtopic_count(&self) -> usize {
        self.sections.iter().map(|s| s.subtopics.len()).sum()
    }

    /// Plain-text outline used for prompting and course-level embedding.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.course_title {
            out.push_str(title);
            out.push('\n');
        }
        for (idx, section) in self.sections.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, section.title));
            for subtopic in &section.subtopics {
                out.push_str(&format!("   - {}\n", subtopic));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Roadmap {
        Roadmap {
            course_title: Some("Rust Basics".to_string()),
            sections: vec![
                RoadmapSection {
                    title: "Intro".to_string(),
                    subtopics: vec!["What is Rust".to_string(), "Why Rust".to_string()],
                },
                RoadmapSection {
                    title: "Ownership".to_string(),
                    subtopics: vec!["Moves".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_subtopic_count() {
        assert_eq!(sample().subtopic_count(), 3);
    }

    #[test]
    fn test_outline_lists_sections_in_order() {
        let outline = sample().outline();
        let intro = outline.find("1. Intro").unwrap();
        let ownership = outline.find("2. Ownership").unwrap();
        assert!(intro < ownership);
        assert!(outline.contains("   - What is Rust"));
        assert!(outline.starts_with("Rust Basics"));
    }
}
