//! Mock media engine for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::media::{MediaEngine, MediaError, MediaInfo, NarrationClip, SlideFrame};

/// A recorded slideshow compilation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCompile {
    pub frame_count: usize,
    pub has_narration: bool,
    pub output: PathBuf,
}

/// Mock implementation of the MediaEngine trait.
///
/// Every operation fabricates its output file on disk so later stages can
/// read real paths. Each operation has an independent failure switch.
#[derive(Debug, Clone)]
pub struct MockMediaEngine {
    probe_duration: Arc<RwLock<f64>>,
    fail_probe: Arc<RwLock<bool>>,
    fail_mix: Arc<RwLock<bool>>,
    fail_concat: Arc<RwLock<bool>>,
    fail_compile: Arc<RwLock<bool>>,
    fail_placeholder: Arc<RwLock<bool>>,
    mixed: Arc<Mutex<Vec<PathBuf>>>,
    concatenated: Arc<Mutex<Vec<PathBuf>>>,
    compiled: Arc<Mutex<Vec<RecordedCompile>>>,
    placeholders: Arc<Mutex<Vec<String>>>,
}

impl Default for MockMediaEngine {
    fn default() -> Self {
        Self {
            probe_duration: Arc::new(RwLock::new(30.0)),
            fail_probe: Arc::new(RwLock::new(false)),
            fail_mix: Arc::new(RwLock::new(false)),
            fail_concat: Arc::new(RwLock::new(false)),
            fail_compile: Arc::new(RwLock::new(false)),
            fail_placeholder: Arc::new(RwLock::new(false)),
            mixed: Arc::new(Mutex::new(Vec::new())),
            concatenated: Arc::new(Mutex::new(Vec::new())),
            compiled: Arc::new(Mutex::new(Vec::new())),
            placeholders: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockMediaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration reported by every probe call. Defaults to 30 seconds.
    pub fn set_probe_duration(&self, secs: f64) {
        *self.probe_duration.write().unwrap() = secs;
    }

    pub fn set_fail_probe(&self, fail: bool) {
        *self.fail_probe.write().unwrap() = fail;
    }

    pub fn set_fail_mix(&self, fail: bool) {
        *self.fail_mix.write().unwrap() = fail;
    }

    pub fn set_fail_concat(&self, fail: bool) {
        *self.fail_concat.write().unwrap() = fail;
    }

    pub fn set_fail_compile(&self, fail: bool) {
        *self.fail_compile.write().unwrap() = fail;
    }

    pub fn set_fail_placeholder(&self, fail: bool) {
        *self.fail_placeholder.write().unwrap() = fail;
    }

    /// Output paths of successful mix calls.
    pub fn mixed(&self) -> Vec<PathBuf> {
        self.mixed.lock().unwrap().clone()
    }

    /// Output paths of successful concat fallback calls.
    pub fn concatenated(&self) -> Vec<PathBuf> {
        self.concatenated.lock().unwrap().clone()
    }

    /// Successful slideshow compilations, in order.
    pub fn compiled(&self) -> Vec<RecordedCompile> {
        self.compiled.lock().unwrap().clone()
    }

    /// Captions of successfully rendered placeholder slides.
    pub fn placeholders(&self) -> Vec<String> {
        self.placeholders.lock().unwrap().clone()
    }

    fn write_output(&self, output: &Path, contents: &[u8]) -> Result<(), MediaError> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, contents)?;
        Ok(())
    }
}

#[async_trait]
impl MediaEngine for MockMediaEngine {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        if *self.fail_probe.read().unwrap() {
            return Err(MediaError::probe(format!(
                "mock probe failure for {}",
                path.display()
            )));
        }
        Ok(MediaInfo {
            duration_secs: *self.probe_duration.read().unwrap(),
        })
    }

    async fn mix_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError> {
        if clips.is_empty() {
            return Err(MediaError::no_input("no narration clips"));
        }
        if *self.fail_mix.read().unwrap() {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "mock mix failure",
                None,
            ));
        }
        self.write_output(output, b"mock-mix")?;
        self.mixed.lock().unwrap().push(output.to_path_buf());
        Ok(())
    }

    async fn concat_narration(
        &self,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<(), MediaError> {
        if clips.is_empty() {
            return Err(MediaError::no_input("no narration clips"));
        }
        if *self.fail_concat.read().unwrap() {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "mock concat failure",
                None,
            ));
        }
        self.write_output(output, b"mock-concat")?;
        self.concatenated.lock().unwrap().push(output.to_path_buf());
        Ok(())
    }

    async fn compile_slideshow(
        &self,
        frames: &[SlideFrame],
        narration: Option<&Path>,
        output: &Path,
    ) -> Result<(), MediaError> {
        if frames.is_empty() {
            return Err(MediaError::no_input("no slide frames"));
        }
        if *self.fail_compile.read().unwrap() {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "mock compile failure",
                None,
            ));
        }
        self.write_output(output, b"mock-video")?;
        self.compiled.lock().unwrap().push(RecordedCompile {
            frame_count: frames.len(),
            has_narration: narration.is_some(),
            output: output.to_path_buf(),
        });
        Ok(())
    }

    async fn render_placeholder(&self, caption: &str, output: &Path) -> Result<(), MediaError> {
        if *self.fail_placeholder.read().unwrap() {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "mock placeholder failure",
                None,
            ));
        }
        self.write_output(output, b"mock-placeholder-png")?;
        self.placeholders.lock().unwrap().push(caption.to_string());
        Ok(())
    }
}
