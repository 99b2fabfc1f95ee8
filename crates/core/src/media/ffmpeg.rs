//! ffmpeg/ffprobe-backed media engine.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::metrics;

use super::config::MediaConfig;
use super::engine::MediaEngine;
use super::error::MediaError;
use super::types::{MediaInfo, NarrationClip, SlideFrame};

const PROBE_TIMEOUT_SECS: u64 = 30;
const PLACEHOLDER_TIMEOUT_SECS: u64 = 30;
const STDERR_TAIL_LINES: usize = 30;

/// Media engine that shells out to ffmpeg and ffprobe.
pub struct FfmpegEngine {
    config: MediaConfig,
}

impl FfmpegEngine {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MediaConfig::default())
    }

    fn loudnorm_filter(&self) -> String {
        format!(
            "loudnorm=I={}:TP={}:LRA=11",
            self.config.loudness_target_lufs, self.config.loudness_true_peak
        )
    }

    /// Arguments for the time-aligned mix: every clip delayed to its
    /// transcript offset, mixed, then loudness normalized. One clip skips
    /// the mix and goes straight through delay + loudnorm.
    fn build_mix_args(&self, clips: &[NarrationClip], output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into()];
        for clip in clips {
            args.push("-i".into());
            args.push(clip.path.to_string_lossy().into_owned());
        }

        let filter = if clips.len() == 1 {
            let delay_ms = (clips[0].offset_seconds * 1000.0).round().max(0.0) as u64;
            if delay_ms > 0 {
                format!(
                    "[0:a]adelay={d}|{d},{loudnorm}[out]",
                    d = delay_ms,
                    loudnorm = self.loudnorm_filter()
                )
            } else {
                format!("[0:a]{}[out]", self.loudnorm_filter())
            }
        } else {
            let mut filter = String::new();
            let mut labels = String::new();
            for (idx, clip) in clips.iter().enumerate() {
                let delay_ms = (clip.offset_seconds * 1000.0).round().max(0.0) as u64;
                filter.push_str(&format!(
                    "[{idx}:a]adelay={d}|{d}[a{idx}];",
                    idx = idx,
                    d = delay_ms
                ));
                labels.push_str(&format!("[a{idx}]"));
            }
            filter.push_str(&format!(
                "{labels}amix=inputs={n}:normalize=0[mix];[mix]{loudnorm}[out]",
                labels = labels,
                n = clips.len(),
                loudnorm = self.loudnorm_filter()
            ));
            filter
        };

        args.extend([
            "-filter_complex".into(),
            filter,
            "-map".into(),
            "[out]".into(),
            "-c:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "2".into(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn build_concat_args(&self, list_path: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.to_string_lossy().into_owned(),
            "-c:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "2".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    fn build_slideshow_args(
        &self,
        list_path: &Path,
        narration: Option<&Path>,
        output: &Path,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.to_string_lossy().into_owned(),
        ];
        if let Some(narration) = narration {
            args.push("-i".into());
            args.push(narration.to_string_lossy().into_owned());
        }
        args.extend([
            "-c:v".into(),
            self.config.video_codec.clone(),
            "-pix_fmt".into(),
            self.config.pixel_format.clone(),
            "-r".into(),
            self.config.fps.to_string(),
        ]);
        if narration.is_some() {
            // Truncate to the shorter stream so trailing silence or extra
            // slides never pad the video.
            args.extend([
                "-c:a".into(),
                self.config.audio_codec.clone(),
                "-b:a".into(),
                self.config.audio_bitrate.clone(),
                "-shortest".into(),
            ]);
        }
        args.extend([
            "-movflags".into(),
            "+faststart".into(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn build_placeholder_args(&self, caption: &str, output: &Path) -> Vec<String> {
        let source = format!(
            "color=c={}:s={}",
            self.config.placeholder_background, self.config.placeholder_size
        );
        let drawtext = format!(
            "drawtext=text='{}':fontcolor=white:fontsize=44:x=(w-text_w)/2:y=(h-text_h)/2",
            escape_drawtext(caption)
        );
        vec![
            "-y".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            source,
            "-frames:v".into(),
            "1".into(),
            "-vf".into(),
            drawtext,
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Run ffmpeg with a wall-clock budget; the child is killed on timeout.
    async fn run_ffmpeg(&self, args: &[String], timeout_secs: u64) -> Result<(), MediaError> {
        debug!(tool = "ffmpeg", ?args, "Running media tool");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        let stderr = child.stderr.take();

        let result = timeout(Duration::from_secs(timeout_secs), async {
            // Drain stderr (keeping a tail for diagnostics) before waiting,
            // otherwise a chatty child can fill the pipe and deadlock.
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
                        .with_label_values(&["ffmpeg", "success"])
                        .inc();
                    Ok(())
                } else {
                    metrics::SUBPROCESS_RUNS
                        .with_label_values(&["ffmpeg", "failed"])
                        .inc();
                    let stderr_tail = if tail.is_empty() {
                        None
                    } else {
                        Some(tail.join("\n"))
                    };
                    Err(MediaError::command_failed(
                        "ffmpeg",
                        format!("exited with code {:?}", status.code()),
                        stderr_tail,
                    ))
                }
            }
            Ok(Err(e)) => Err(MediaError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                metrics::SUBPROCESS_TIMEOUTS
                    .with_label_values(&["ffmpeg"])
                    .inc();
                warn!(timeout_secs, "ffmpeg timed out, killed");
                Err(MediaError::Timeout { timeout_secs })
            }
        }
    }

    async fn write_list_file(&self, path: &Path, contents: String) -> Result<(), MediaError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }
}

/// Concat-demuxer list of narration clips, back to back.
fn audio_concat_list(clips: &[NarrationClip]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for clip in clips {
        list.push_str(&format!("file '{}'\n", concat_escape(&clip.path)));
    }
    list
}

/// Concat-demuxer list of slide frames with per-frame durations.
///
/// The demuxer ignores the duration on the final entry, so the last frame
/// is listed twice.
fn frame_concat_list(frames: &[SlideFrame]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for frame in frames {
        list.push_str(&format!("file '{}'\n", concat_escape(&frame.path)));
        list.push_str(&format!("duration {:.3}\n", frame.duration_seconds));
    }
    if let Some(last) = frames.last() {
        list.push_str(&format!("file '{}'\n", concat_escape(&last.path)));
    }
    list
}

fn concat_escape(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Strip characters that break the drawtext filter expression.
fn escape_drawtext(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\\' | '%' | ';' | '[' | ']'))
        .map(|c| if c == ':' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_probe_output(json: &str) -> Result<MediaInfo, MediaError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        format: Option<ProbeFormat>,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| MediaError::probe(e.to_string()))?;

    parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .map(|duration_secs| MediaInfo { duration_secs })
        .ok_or_else(|| MediaError::probe("no duration in probe output"))
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let command = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output();

        let output = timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), command)
            .await
            .map_err(|_| {
                metrics::SUBPROCESS_TIMEOUTS
                    .with_label_values(&["ffprobe"])
                    .inc();
                MediaError::Timeout {
                    timeout_secs: PROBE_TIMEOUT_SECS,
                }
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        if !output.status.success() {
            metrics::SUBPROCESS_RUNS
                .with_label_values(&["ffprobe", "failed"])
                .inc();
            return Err(MediaError::probe(format!(
                "ffprobe exited with code {:?}",
                output.status.code()
            )));
        }
        metrics::SUBPROCESS_RUNS
            .with_label_values(&["ffprobe", "success"])
            .inc();

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn mix_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError> {
        if clips.is_empty() {
            return Err(MediaError::no_input("no narration clips to mix"));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let args = self.build_mix_args(clips, output);
        self.run_ffmpeg(&args, self.config.mix_timeout_secs).await
    }

    async fn concat_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError> {
        if clips.is_empty() {
            return Err(MediaError::no_input("no narration clips to concatenate"));
        }
        let list_path = sibling_list_path(output, "concat");
        self.write_list_file(&list_path, audio_concat_list(clips))
            .await?;

        let args = self.build_concat_args(&list_path, output);
        let result = self.run_ffmpeg(&args, self.config.mix_timeout_secs).await;
        let _ = tokio::fs::remove_file(&list_path).await;
        result
    }

    async fn compile_slideshow(
        &self,
        frames: &[SlideFrame],
        narration: Option<&Path>,
        output: &Path,
    ) -> Result<(), MediaError> {
        if frames.is_empty() {
            return Err(MediaError::no_input("no slide frames to encode"));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let list_path = sibling_list_path(output, "frames");
        self.write_list_file(&list_path, frame_concat_list(frames))
            .await?;

        let args = self.build_slideshow_args(&list_path, narration, output);
        let result = self
            .run_ffmpeg(&args, self.config.encode_timeout_secs)
            .await;
        let _ = tokio::fs::remove_file(&list_path).await;
        result?;

        // A zero-byte output counts as a failure even on exit code 0.
        let meta = tokio::fs::metadata(output)
            .await
            .map_err(|_| MediaError::command_failed("ffmpeg", "output file not created", None))?;
        if meta.len() == 0 {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "output file is empty",
                None,
            ));
        }
        Ok(())
    }

    async fn render_placeholder(&self, caption: &str, output: &Path) -> Result<(), MediaError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let args = self.build_placeholder_args(caption, output);
        self.run_ffmpeg(&args, PLACEHOLDER_TIMEOUT_SECS).await
    }
}

/// Scratch list file placed next to the output it feeds.
fn sibling_list_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    let name = format!("{}_{}.txt", stem, suffix);
    match output.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
