//! On-disk layout for generated course artifacts.
//!
//! Every path the pipeline writes is derived here, so a re-run of the same
//! job lands on the same files and can skip what already exists. Titles
//! are slugged for filesystem and object-key safety; section directories
//! are keyed by position, which is stable across runs, rather than title.

use std::path::{Path, PathBuf};

const MAX_SLUG_LEN: usize = 60;

/// Root of the generation workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

/// All file locations for one subtopic's artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtopicPaths {
    /// Slide deck markdown.
    pub deck: PathBuf,
    /// Timestamped narration transcript.
    pub transcript: PathBuf,
    /// Per-segment narration clips.
    pub clips_dir: PathBuf,
    /// Combined narration track.
    pub narration: PathBuf,
    /// Rendered slide images.
    pub slides_dir: PathBuf,
    /// Compiled video.
    pub video: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn course_dir(&self, course_id: &str) -> PathBuf {
        self.root.join("courses").join(slugify(course_id))
    }

    pub fn section_dir(&self, course_id: &str, position: u32) -> PathBuf {
        self.course_dir(course_id)
            .join("sections")
            .join(format!("{:02}", position))
    }

    /// Locations of every artifact for one subtopic.
    pub fn subtopic_paths(
        &self,
        course_id: &str,
        section_position: u32,
        subtopic_title: &str,
    ) -> SubtopicPaths {
        let dir = self.section_dir(course_id, section_position);
        let slug = slugify(subtopic_title);
        SubtopicPaths {
            deck: dir.join(format!("{}.md", slug)),
            transcript: dir.join(format!("{}.transcript.txt", slug)),
            clips_dir: dir.join(format!("{}_audio", slug)),
            narration: dir.join(format!("{}.mp3", slug)),
            slides_dir: dir.join(format!("{}_slides", slug)),
            video: dir.join(format!("{}.mp4", slug)),
        }
    }

    /// Object-storage key for a subtopic's published video.
    pub fn video_key(&self, course_id: &str, section_position: u32, subtopic_title: &str) -> String {
        format!(
            "courses/{}/videos/{:02}/{}.mp4",
            slugify(course_id),
            section_position,
            slugify(subtopic_title)
        )
    }
}

/// Reduce a title to a lowercase filesystem/object-key-safe slug.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
