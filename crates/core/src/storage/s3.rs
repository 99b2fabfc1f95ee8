use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client,
};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

use crate::metrics;

use super::config::StorageConfig;
use super::error::StorageError;
use super::store::ObjectStore;

/// S3-compatible object store. A custom endpoint switches the client to
/// path-style addressing, which MinIO requires.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
    upload_timeout: Duration,
}

impl S3ObjectStore {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::NotConfigured);
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "courseforge",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .behavior_version_latest();

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint.clone())
                .force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        let public_base_url = public_base_url(&config);

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base_url,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_key(key))
    }
}

/// Base URL objects are served from: an explicit override, the custom
/// endpoint in path style, or the AWS virtual-hosted form.
fn public_base_url(config: &StorageConfig) -> String {
    if let Some(base) = &config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    if let Some(endpoint) = &config.endpoint {
        return format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket);
    }
    format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region)
}

/// Percent-encode each path segment, keeping the separators.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<String, StorageError> {
        debug!(key, size = bytes.len(), "Uploading object");
        let started = Instant::now();

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes));
        if public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        let result = timeout(self.upload_timeout, request.send()).await;

        metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&["storage"])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(_)) => {
                metrics::EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["storage", "success"])
                    .inc();
                Ok(self.public_url(key))
            }
            Ok(Err(e)) => {
                metrics::EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["storage", "error"])
                    .inc();
                Err(StorageError::upload(e.to_string()))
            }
            Err(_) => {
                metrics::EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["storage", "timeout"])
                    .inc();
                Err(StorageError::Timeout {
                    timeout_secs: self.upload_timeout.as_secs(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_base_url_aws() {
        let config = StorageConfig {
            bucket: "courses".to_string(),
            region: "eu-west-1".to_string(),
            ..Default::default()
        };
        assert_eq!(
            public_base_url(&config),
            "https://courses.s3.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_public_base_url_custom_endpoint() {
        let config = StorageConfig {
            bucket: "courses".to_string(),
            endpoint: Some("http://localhost:9000/".to_string()),
            ..Default::default()
        };
        assert_eq!(public_base_url(&config), "http://localhost:9000/courses");
    }

    #[test]
    fn test_public_base_url_override_wins() {
        let config = StorageConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            public_base_url: Some("https://cdn.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(public_base_url(&config), "https://cdn.example.com");
    }

    #[test]
    fn test_encode_key_preserves_separators() {
        assert_eq!(
            encode_key("courses/abc/videos/1/intro to rust.mp4"),
            "courses/abc/videos/1/intro%20to%20rust.mp4"
        );
    }

    #[test]
    fn test_empty_bucket_is_not_configured() {
        let config = StorageConfig {
            bucket: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            S3ObjectStore::new(config),
            Err(StorageError::NotConfigured)
        ));
    }
}
