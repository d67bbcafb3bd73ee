// dbbackup-agent/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::path::Path;
use tracing::info;

use crate::config::S3Config;
use crate::errors::UploadError;

/// Pushes a finished artifact to durable storage.
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<(), UploadError>;
}

/// Uploads to an S3-compatible object storage service (AWS S3, DigitalOcean Spaces, MinIO).
pub struct S3Uploader {
    client: s3::Client,
    bucket: String,
    path_prefix: String,
}

impl S3Uploader {
    pub async fn new(s3_config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(s3_config.region.clone()));
        if let Some(endpoint) = &s3_config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if !s3_config.access_key_id.is_empty() {
            loader = loader.credentials_provider(s3::config::Credentials::new(
                &s3_config.access_key_id,
                &s3_config.secret_access_key,
                None, // session_token
                None, // expiry
                "Static",
            ));
        }
        let sdk_config = loader.load().await;

        S3Uploader {
            client: s3::Client::new(&sdk_config),
            bucket: s3_config.bucket.clone(),
            path_prefix: s3_config.path_prefix.clone(),
        }
    }
}

#[async_trait]
impl UploadGateway for S3Uploader {
    async fn upload(&self, local_path: &Path) -> Result<(), UploadError> {
        let key = object_key(&self.path_prefix, local_path)?;
        info!(path = %local_path.display(), bucket = %self.bucket, key = %key, "Uploading backup to S3");

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| UploadError::Read {
                path: local_path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Put {
                bucket: self.bucket.clone(),
                key: key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!(bucket = %self.bucket, key = %key, "✅ Backup uploaded to S3");
        Ok(())
    }
}

/// `<prefix>/<artifact file name>`, without doubled or leading slashes.
pub fn object_key(path_prefix: &str, local_path: &Path) -> Result<String, UploadError> {
    let file_name = local_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UploadError::InvalidPath(local_path.to_path_buf()))?;

    let prefix = path_prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(file_name.to_string())
    } else {
        Ok(format!("{}/{}", prefix, file_name))
    }
}
