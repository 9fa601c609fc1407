//! S3-compatible object storage (Cloudflare R2).
//!
//! The bucket stays private: clients upload with pre-signed PUT URLs and media
//! is rendered through short-lived pre-signed GET URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::warn;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String>;

    async fn presign_get(&self, key: &str) -> Result<String>;

    /// Public (CDN) base URL without trailing slash; empty when unset.
    fn public_base_url(&self) -> &str;

    /// Root folder every object key starts with.
    fn key_prefix(&self) -> &str;

    fn public_url(&self, key: &str) -> Result<String> {
        let base = self.public_base_url().trim_end_matches('/');
        if base.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!("Storage public base URL is not configured")));
        }
        Ok(format!("{}/{}", base, key.trim_start_matches('/')))
    }

    /// Object key addressed by a stored URL, when it points into our bucket.
    fn key_for_url(&self, url: &str) -> Option<String> {
        let url = url.trim();
        let base = self.public_base_url().trim_end_matches('/');
        let prefix = format!("{}/", self.key_prefix());

        if !base.is_empty() {
            if let Some(rest) = url.strip_prefix(base) {
                let path = strip_query(rest).trim_start_matches('/');
                if !path.is_empty() {
                    return Some(decode_path(path));
                }
            }
        }

        let bare = url.trim_start_matches('/');
        if bare.starts_with(&prefix) {
            return Some(decode_path(bare));
        }

        let after_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))?;
        let (_, path) = after_scheme.split_once('/')?;
        let path = strip_query(path);
        path.starts_with(&prefix).then(|| decode_path(path))
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

fn decode_path(path: &str) -> String {
    if path.contains('%') {
        if let Ok(decoded) = urlencoding::decode(path) {
            return decoded.into_owned();
        }
    }
    path.to_string()
}

/// Render a stored media URL for clients.
///
/// URLs pointing into the bucket become signed GET URLs; anything else, or a
/// signing failure, falls back to the stored value.
pub async fn display_url(storage: &dyn ObjectStorage, url: Option<&str>) -> Option<String> {
    let url = url.map(str::trim).filter(|u| !u.is_empty())?;
    let Some(key) = storage.key_for_url(url) else {
        return Some(url.to_string());
    };
    match storage.presign_get(&key).await {
        Ok(signed) => Some(signed),
        Err(e) => {
            warn!(error = %e, "signed GET failed; serving stored media URL");
            Some(url.to_string())
        }
    }
}

/// Cloudflare R2 through the S3 API.
#[derive(Clone)]
pub struct R2Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
    key_prefix: String,
    upload_expiry: Duration,
    download_expiry: Duration,
}

impl R2Storage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "digital-house-api",
        );

        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .endpoint_url(config.endpoint())
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            key_prefix: config.key_prefix.clone(),
            upload_expiry: Duration::from_secs(config.upload_expiry_seconds),
            download_expiry: Duration::from_secs(config.download_expiry_seconds),
        })
    }

    fn presigning(expires_in: Duration) -> Result<PresigningConfig> {
        PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create presign config: {e}")))
    }
}

#[async_trait]
impl ObjectStorage for R2Storage {
    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning(self.upload_expiry)?)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to generate presigned URL: {e}")))?;

        Ok(presigned.uri().to_string())
    }

    async fn presign_get(&self, key: &str) -> Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(self.download_expiry)?)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to generate presigned URL: {e}")))?;

        Ok(presigned.uri().to_string())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Stand-in used when storage credentials are missing. Uploads fail, stored
/// URLs are rendered unchanged.
pub struct UnconfiguredStorage {
    key_prefix: String,
}

impl UnconfiguredStorage {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for UnconfiguredStorage {
    async fn presign_put(&self, _key: &str, _content_type: &str) -> Result<String> {
        Err(AppError::Internal(anyhow::anyhow!("Object storage is not configured")))
    }

    async fn presign_get(&self, _key: &str) -> Result<String> {
        Err(AppError::Internal(anyhow::anyhow!("Object storage is not configured")))
    }

    fn public_base_url(&self) -> &str {
        ""
    }

    fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubStorage;

    #[async_trait]
    impl ObjectStorage for StubStorage {
        async fn presign_put(&self, key: &str, _content_type: &str) -> Result<String> {
            Ok(format!("https://signed.test/put/{key}"))
        }

        async fn presign_get(&self, key: &str) -> Result<String> {
            Ok(format!("https://signed.test/get/{key}"))
        }

        fn public_base_url(&self) -> &str {
            "https://cdn.test"
        }

        fn key_prefix(&self) -> &str {
            "digital-house"
        }
    }

    #[test]
    fn test_key_for_cdn_url() {
        let storage = StubStorage;
        assert_eq!(
            storage.key_for_url("https://cdn.test/digital-house/posts/jobs/a.png?x=1").as_deref(),
            Some("digital-house/posts/jobs/a.png")
        );
        assert_eq!(
            storage.key_for_url("https://cdn.test/digital-house/profile/1/my%20photo.png").as_deref(),
            Some("digital-house/profile/1/my photo.png")
        );
    }

    #[test]
    fn test_key_for_bare_key_and_foreign_host() {
        let storage = StubStorage;
        assert_eq!(
            storage.key_for_url("/digital-house/profile/1/a.png").as_deref(),
            Some("digital-house/profile/1/a.png")
        );
        assert_eq!(
            storage.key_for_url("https://other.host/digital-house/x.png").as_deref(),
            Some("digital-house/x.png")
        );
        assert_eq!(storage.key_for_url("https://other.host/images/x.png"), None);
    }

    #[test]
    fn test_public_url_joins_cleanly() {
        let storage = StubStorage;
        assert_eq!(
            storage.public_url("/digital-house/a.png").unwrap(),
            "https://cdn.test/digital-house/a.png"
        );
        assert!(UnconfiguredStorage::new("digital-house").public_url("a").is_err());
    }

    #[tokio::test]
    async fn test_display_url_signs_bucket_urls_only() {
        let storage = StubStorage;
        let signed = display_url(&storage, Some("https://cdn.test/digital-house/a.png")).await;
        assert_eq!(signed.as_deref(), Some("https://signed.test/get/digital-house/a.png"));

        let foreign = display_url(&storage, Some("https://example.com/a.png")).await;
        assert_eq!(foreign.as_deref(), Some("https://example.com/a.png"));

        assert_eq!(display_url(&storage, Some("  ")).await, None);
        assert_eq!(display_url(&storage, None).await, None);
    }

    #[tokio::test]
    async fn test_display_url_falls_back_when_unconfigured() {
        let storage = UnconfiguredStorage::new("digital-house");
        let url = "/digital-house/profile/1/a.png";
        assert_eq!(display_url(&storage, Some(url)).await.as_deref(), Some(url));
    }
}
