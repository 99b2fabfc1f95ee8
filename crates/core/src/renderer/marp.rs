use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::metrics;

use super::config::RendererConfig;
use super::engine::{RenderMode, SlideRenderer};
use super::error::RendererError;

const STDERR_TAIL_LINES: usize = 30;

/// Slide renderer backed by the marp CLI.
pub struct MarpRenderer {
    config: RendererConfig,
}

impl MarpRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RendererConfig::default())
    }

    fn build_args(&self, deck: &Path, output_base: &Path, mode: RenderMode) -> Vec<String> {
        let scale = match mode {
            RenderMode::Standard => self.config.image_scale,
            RenderMode::Defensive => 1,
        };
        vec![
            "--images".into(),
            "png".into(),
            "--image-scale".into(),
            scale.to_string(),
            "--allow-local-files".into(),
            "-o".into(),
            output_base.to_string_lossy().into_owned(),
            deck.to_string_lossy().into_owned(),
        ]
    }

    async fn run_marp(&self, args: &[String], mode: RenderMode) -> Result<(), RendererError> {
        debug!(?mode, ?args, "Running marp");

        let mut command = Command::new(&self.config.marp_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if mode == RenderMode::Defensive {
            command.env("CHROME_NO_SANDBOX", "true");
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RendererError::ToolNotFound {
                    path: self.config.marp_path.clone(),
                }
            } else {
                RendererError::Io(e)
            }
        })?;

        let stderr = child.stderr.take();

        let result = timeout(Duration::from_secs(self.config.timeout_secs), async {
            let mut tail: Vec<String> = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() >= STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, Vec<String>), std::io::Error>((status, tail))
        })
        .await;

        match result {
            Ok(Ok((status, tail))) => {
                if status.success() {
                    metrics::SUBPROCESS_RUNS
                        .with_label_values(&["marp", "success"])
                        .inc();
                    Ok(())
                } else {
                    metrics::SUBPROCESS_RUNS
                        .with_label_values(&["marp", "failed"])
                        .inc();
                    let stderr_tail = if tail.is_empty() {
                        None
                    } else {
                        Some(tail.join("\n"))
                    };
                    Err(RendererError::failed(
                        format!("exited with code {:?}", status.code()),
                        stderr_tail,
                    ))
                }
            }
            Ok(Err(e)) => Err(RendererError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                metrics::SUBPROCESS_TIMEOUTS
                    .with_label_values(&["marp"])
                    .inc();
                warn!(
                    timeout_secs = self.config.timeout_secs,
                    "marp timed out, killed"
                );
                Err(RendererError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        }
    }
}

#[async_trait]
impl SlideRenderer for MarpRenderer {
    async fn render(
        &self,
        deck: &Path,
        out_dir: &Path,
        mode: RenderMode,
    ) -> Result<Vec<PathBuf>, RendererError> {
        tokio::fs::create_dir_all(out_dir).await?;
        remove_rendered_images(out_dir).await?;

        // marp expands "slide.png" into slide.001.png, slide.002.png, ...
        let output_base = out_dir.join("slide.png");
        let args = self.build_args(deck, &output_base, mode);
        self.run_marp(&args, mode).await?;

        let images = collect_rendered_images(out_dir).await?;
        if images.is_empty() {
            return Err(RendererError::NoOutput);
        }
        Ok(images)
    }
}

/// Drop leftovers from a previous attempt so a shorter re-render cannot
/// leave stale trailing slides in the sequence.
async fn remove_rendered_images(out_dir: &Path) -> Result<(), RendererError> {
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if is_slide_image(&entry.path()) {
            let _ = tokio::fs::remove_file(entry.path()).await;
        }
    }
    Ok(())
}

async fn collect_rendered_images(out_dir: &Path) -> Result<Vec<PathBuf>, RendererError> {
    let mut images: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_slide_image(&path) {
            images.push(path);
        }
    }
    // Zero-padded sequence numbers, so name order is slide order.
    images.sort();
    Ok(images)
}

fn is_slide_image(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.starts_with("slide") && name.ends_with(".png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_args_use_configured_scale() {
        let renderer = MarpRenderer::with_defaults();
        let args = renderer.build_args(
            Path::new("/tmp/deck.md"),
            Path::new("/tmp/slides/slide.png"),
            RenderMode::Standard,
        );
        let idx = args.iter().position(|a| a == "--image-scale").unwrap();
        assert_eq!(args[idx + 1], "2");
        assert_eq!(args.last().unwrap(), "/tmp/deck.md");
        assert!(args.contains(&"--allow-local-files".to_string()));
    }

    #[test]
    fn test_defensive_args_reduce_scale() {
        let renderer = MarpRenderer::with_defaults();
        let args = renderer.build_args(
            Path::new("/tmp/deck.md"),
            Path::new("/tmp/slides/slide.png"),
            RenderMode::Defensive,
        );
        let idx = args.iter().position(|a| a == "--image-scale").unwrap();
        assert_eq!(args[idx + 1], "1");
    }

    #[test]
    fn test_is_slide_image() {
        assert!(is_slide_image(Path::new("/tmp/slide.001.png")));
        assert!(is_slide_image(Path::new("/tmp/slide.012.png")));
        assert!(!is_slide_image(Path::new("/tmp/deck.md")));
        assert!(!is_slide_image(Path::new("/tmp/cover.png")));
    }

    #[tokio::test]
    async fn test_collect_rendered_images_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["slide.003.png", "slide.001.png", "slide.002.png", "deck.md"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        let images = collect_rendered_images(dir.path()).await.unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["slide.001.png", "slide.002.png", "slide.003.png"]);
    }
}
