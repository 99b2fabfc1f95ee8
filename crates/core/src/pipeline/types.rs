//! Pipeline result and model-payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FlashcardRow, QuizRow, SectionRow, SubtopicRow};

/// The final course package, rebuilt from persisted rows at the end of a
/// run rather than accumulated in memory along the way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePackage {
    pub course_id: String,
    pub title: String,
    pub sections: Vec<SectionPackage>,
    pub quizzes: Vec<QuizRow>,
    pub flashcards: Vec<FlashcardRow>,
    /// Published video URLs in course order.
    pub videos: Vec<String>,
    pub generation_summary: GenerationSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPackage {
    #[serde(flatten)]
    pub section: SectionRow,
    pub subtopics: Vec<SubtopicRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub total_sections: usize,
    pub total_subtopics: usize,
    pub total_videos: usize,
    pub total_quizzes: usize,
    pub total_flashcards: usize,
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
}

const MIN_QUIZ_QUESTIONS: usize = 5;
const MAX_QUIZ_QUESTIONS: usize = 8;
const QUIZ_OPTIONS: usize = 4;

/// Quiz as the model is asked to produce it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    #[serde(default)]
    pub title: Option<String>,
    pub questions: Vec<QuizQuestionPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionPayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

impl QuizPayload {
    /// Check the payload against the schema the prompt asked for.
    /// Violations discard the quiz for its section; there is no retry.
    pub fn validate(&self) -> Result<(), String> {
        let count = self.questions.len();
        if !(MIN_QUIZ_QUESTIONS..=MAX_QUIZ_QUESTIONS).contains(&count) {
            return Err(format!(
                "expected {} to {} questions, got {}",
                MIN_QUIZ_QUESTIONS, MAX_QUIZ_QUESTIONS, count
            ));
        }
        for (idx, question) in self.questions.iter().enumerate() {
            if question.question.trim().is_empty() {
                return Err(format!("question {} is empty", idx + 1));
            }
            if question.options.len() != QUIZ_OPTIONS {
                return Err(format!(
                    "question {} has {} options, expected {}",
                    idx + 1,
                    question.options.len(),
                    QUIZ_OPTIONS
                ));
            }
            if question.correct_index as usize >= QUIZ_OPTIONS {
                return Err(format!(
                    "question {} marks option {} correct, but options end at {}",
                    idx + 1,
                    question.correct_index,
                    QUIZ_OPTIONS - 1
                ));
            }
        }
        Ok(())
    }
}

/// Flashcard as the model is asked to produce it.
#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardPayload {
    pub front: String,
    pub back: String,
}

impl FlashcardPayload {
    pub fn validate(&self) -> Result<(), String> {
        if self.front.trim().is_empty() {
            return Err("flashcard front is empty".to_string());
        }
        if self.back.trim().is_empty() {
            return Err("flashcard back is empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz_with(questions: usize, options: usize, correct: u32) -> QuizPayload {
        QuizPayload {
            title: Some("Quiz".to_string()),
            questions: (0..questions)
                .map(|i| QuizQuestionPayload {
                    question: format!("Q{}?", i),
                    options: (0..options).map(|o| format!("O{}", o)).collect(),
                    correct_index: correct,
                })
                .collect(),
        }
    }

    #[test]
    fn test_quiz_validation_bounds() {
        assert!(quiz_with(5, 4, 0).validate().is_ok());
        assert!(quiz_with(8, 4, 3).validate().is_ok());
        assert!(quiz_with(4, 4, 0).validate().is_err());
        assert!(quiz_with(9, 4, 0).validate().is_err());
        assert!(quiz_with(5, 3, 0).validate().is_err());
        assert!(quiz_with(5, 4, 4).validate().is_err());
    }

    #[test]
    fn test_quiz_parses_camel_case() {
        let payload: QuizPayload = serde_json::from_value(json!({
            "title": "Section Quiz",
            "questions": [
                {"question": "Q?", "options": ["a", "b", "c", "d"], "correctIndex": 2}
            ],
        }))
        .unwrap();
        assert_eq!(payload.questions[0].correct_index, 2);
    }

    #[test]
    fn test_flashcard_validation() {
        let card = FlashcardPayload {
            front: "What?".to_string(),
            back: "That.".to_string(),
        };
        assert!(card.validate().is_ok());

        let blank = FlashcardPayload {
            front: "  ".to_string(),
            back: "x".to_string(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_package_serializes_camel_case() {
        let package = CoursePackage {
            course_id: "c1".to_string(),
            title: "T".to_string(),
            sections: Vec::new(),
            quizzes: Vec::new(),
            flashcards: Vec::new(),
            videos: vec!["https://cdn.test/a.mp4".to_string()],
            generation_summary: GenerationSummary {
                total_sections: 1,
                total_subtopics: 2,
                total_videos: 1,
                total_quizzes: 1,
                total_flashcards: 1,
                session_id: "sess".to_string(),
                generated_at: Utc::now(),
            },
        };
        let value = serde_json::to_value(&package).unwrap();
        assert_eq!(value["courseId"], "c1");
        assert_eq!(value["generationSummary"]["totalSubtopics"], 2);
        assert_eq!(value["videos"][0], "https://cdn.test/a.mp4");
    }
}
