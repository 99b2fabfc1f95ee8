use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for MinIO or another S3-compatible server; leave
    /// unset for AWS S3.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    /// Overrides the derived public URL base (e.g. a CDN domain). Keys are
    /// appended to it verbatim.
    #[serde(default)]
    pub public_base_url: Option<String>,

    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

fn default_bucket() -> String {
    "courseforge".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_base_url: None,
            upload_timeout_secs: default_upload_timeout_secs(),
        }
    }
}
