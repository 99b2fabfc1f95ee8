use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RendererConfig {
    #[serde(default = "default_marp_path")]
    pub marp_path: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Raster scale for the standard invocation; defensive mode always
    /// drops to 1.
    #[serde(default = "default_image_scale")]
    pub image_scale: u32,

    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_marp_path() -> String {
    "marp".to_string()
}

fn default_timeout_secs() -> u64 {
    150
}

fn default_image_scale() -> u32 {
    2
}

fn default_theme() -> String {
    "default".to_string()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            marp_path: default_marp_path(),
            timeout_secs: default_timeout_secs(),
            image_scale: default_image_scale(),
            theme: default_theme(),
        }
    }
}

impl RendererConfig {
    pub fn with_marp_path(mut self, path: impl Into<String>) -> Self {
        self.marp_path = path.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
