//! Mock slide renderer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::renderer::{count_slides, RenderMode, RendererError, SlideRenderer};

/// Mock implementation of the SlideRenderer trait.
///
/// Writes one placeholder PNG per slide counted in the deck, so downstream
/// stages see a realistic image sequence without a headless browser.
#[derive(Debug, Clone, Default)]
pub struct MockSlideRenderer {
    calls: Arc<RwLock<Vec<(PathBuf, RenderMode)>>>,
    fail_all: Arc<RwLock<bool>>,
    fail_standard: Arc<RwLock<bool>>,
}

impl MockSlideRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render call, regardless of mode.
    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().unwrap() = fail;
    }

    /// Fail standard-mode calls while letting defensive ones succeed.
    pub fn set_fail_standard(&self, fail: bool) {
        *self.fail_standard.write().unwrap() = fail;
    }

    /// All recorded render calls as (deck path, mode), in order.
    pub fn calls(&self) -> Vec<(PathBuf, RenderMode)> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl SlideRenderer for MockSlideRenderer {
    async fn render(
        &self,
        deck: &Path,
        out_dir: &Path,
        mode: RenderMode,
    ) -> Result<Vec<PathBuf>, RendererError> {
        self.calls
            .write()
            .unwrap()
            .push((deck.to_path_buf(), mode));

        if *self.fail_all.read().unwrap() {
            return Err(RendererError::failed("mock renderer failure", None));
        }
        if mode == RenderMode::Standard && *self.fail_standard.read().unwrap() {
            return Err(RendererError::failed("mock sandbox crash", None));
        }

        let markdown = std::fs::read_to_string(deck)?;
        let slides = count_slides(&markdown);

        std::fs::create_dir_all(out_dir)?;
        let mut images = Vec::with_capacity(slides);
        for index in 1..=slides {
            let path = out_dir.join(format!("slide.{:03}.png", index));
            std::fs::write(&path, b"mock-png")?;
            images.push(path);
        }
        Ok(images)
    }
}
