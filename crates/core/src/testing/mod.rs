//! Testing utilities and mock implementations.
//!
//! Every external seam the pipeline depends on has a controllable mock
//! here: completions, speech, embeddings, object storage, slide rendering,
//! media processing and the real-time channel. Persistence is cheap enough
//! that tests use the real SQLite stores in memory instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use courseforge_core::testing::{MockCompletionClient, MockSpeechClient};
//!
//! let llm = MockCompletionClient::new();
//! llm.stub_contains("timestamped transcript", fixtures::transcript());
//! llm.set_default_response(fixtures::deck_markdown());
//!
//! let speech = MockSpeechClient::new();
//! speech.fail_when_contains("flaky segment");
//! ```

mod mock_completion;
mod mock_embedding;
mod mock_media;
mod mock_object_store;
mod mock_realtime;
mod mock_renderer;
mod mock_speech;

pub use mock_completion::MockCompletionClient;
pub use mock_embedding::MockEmbeddingClient;
pub use mock_media::MockMediaEngine;
pub use mock_object_store::{MockObjectStore, RecordedUpload};
pub use mock_realtime::{MockRealtimeChannel, PublishedEvent};
pub use mock_renderer::MockSlideRenderer;
pub use mock_speech::MockSpeechClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    /// A two-slide deck the way the content stage asks for one.
    pub fn deck_markdown() -> String {
        [
            "---",
            "marp: true",
            "theme: default",
            "---",
            "",
            "# Introduction",
            "",
            "- What this subtopic covers",
            "- Why it matters",
            "",
            "---",
            "",
            "# Recap",
            "",
            "- Key takeaways",
        ]
        .join("\n")
    }

    /// A bracket-timestamped transcript matching [`deck_markdown`].
    pub fn transcript() -> String {
        [
            "[00:00] Welcome to this introduction, where we look at what the topic covers.",
            "[00:08] It matters because you will use it constantly in real projects.",
            "[00:16] To recap, remember the key takeaways from this lesson.",
        ]
        .join("\n")
    }

    /// A quiz payload in the schema the assessment stage requests.
    pub fn quiz_json() -> String {
        json!({
            "title": "Section Quiz",
            "questions": (1..=5).map(|i| json!({
                "question": format!("Question {}?", i),
                "options": ["Option A", "Option B", "Option C", "Option D"],
                "correctIndex": i % 4,
            })).collect::<Vec<_>>(),
        })
        .to_string()
    }

    /// A flashcard payload in the schema the assessment stage requests.
    pub fn flashcard_json() -> String {
        json!({
            "front": "What is the core idea of this section?",
            "back": "A concise summary of the section's main concept.",
        })
        .to_string()
    }

    /// Flat-map roadmap: section title to subtopic titles, in order.
    pub fn roadmap_flat() -> Value {
        json!({
            "Intro": ["What is X", "Why X matters"],
        })
    }

    /// Tree-form roadmap with explicit positions.
    pub fn roadmap_tree() -> Value {
        json!({
            "courseTitle": "X from Scratch",
            "sections": [
                {
                    "title": "Intro",
                    "position": 0,
                    "subtopics": [
                        {"title": "What is X"},
                        {"title": "Why X matters"},
                    ],
                },
                {
                    "title": "Deep Dive",
                    "position": 1,
                    "subtopics": ["How X works"],
                },
            ],
        })
    }
}
