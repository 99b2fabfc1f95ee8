use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::RendererError;

/// How aggressively to invoke the rendering tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Full quality, default browser sandboxing.
    Standard,
    /// Sandbox disabled and scale reduced. Used as a second attempt when
    /// the standard invocation fails inside a container.
    Defensive,
}

#[async_trait]
pub trait SlideRenderer: Send + Sync {
    /// Render a markdown deck into an ordered image sequence under
    /// `out_dir`, one file per slide.
    async fn render(
        &self,
        deck: &Path,
        out_dir: &Path,
        mode: RenderMode,
    ) -> Result<Vec<PathBuf>, RendererError>;
}
