//! Artifact upload
//!
//! The uploader is the only component that performs network I/O, and so the
//! natural boundary for mocking. [`S3Uploader`] targets any S3-compatible
//! object store (MinIO, AWS S3); [`MemoryUploader`] keeps objects in memory
//! for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::task::PackagingTask;

/// Object store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL (e.g. "http://localhost:9000").
    pub endpoint: String,

    /// Access key ID.
    pub access_key: String,

    /// Secret access key.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Region name sent alongside the endpoint.
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style URLs (required for MinIO).
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

/// Transmits a local artifact to the remote content store.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Send the task's artifact to its bucket under its remote key,
    /// overwriting any existing object at that key.
    async fn upload(&self, task: &PackagingTask) -> Result<(), UploadError>;
}

/// Uploader backed by an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct S3Uploader {
    config: StorageConfig,
}

impl S3Uploader {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, UploadError> {
        let region = Region::Custom {
            region: self.config.region.clone(),
            endpoint: self.config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&self.config.access_key),
            Some(&self.config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| UploadError::Credentials(e.to_string()))?;

        let bucket = Bucket::new(name, region, credentials)?;
        Ok(if self.config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, task: &PackagingTask) -> Result<(), UploadError> {
        let bucket = self.bucket(task.remote_bucket())?;
        let bytes = tokio::fs::read(task.artifact_path())
            .await
            .map_err(|source| UploadError::Read {
                path: task.artifact_path().to_path_buf(),
                source,
            })?;

        let response = bucket
            .put_object_with_content_type(task.remote_key(), &bytes, "application/zip")
            .await?;
        if response.status_code() != 200 {
            return Err(UploadError::Rejected(response.status_code()));
        }

        tracing::info!(
            "uploaded {} ({} bytes) to {}/{}",
            task.artifact_path().display(),
            bytes.len(),
            task.remote_bucket(),
            task.remote_key()
        );
        Ok(())
    }
}

/// In-memory uploader for tests and dry runs.
///
/// Clones share the same underlying store, so a caller can keep a handle
/// while the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryUploader {
    objects: Arc<Mutex<HashMap<String, HashMap<String, Vec<u8>>>>>,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `bucket`/`key`, if any.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.get(bucket)?.get(key).cloned()
    }

    /// Whether an object exists under `bucket`/`key`.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(bucket)
            .map(|b| b.contains_key(key))
            .unwrap_or(false)
    }

    /// Total number of stored objects across all buckets.
    pub fn len(&self) -> usize {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Uploader for MemoryUploader {
    async fn upload(&self, task: &PackagingTask) -> Result<(), UploadError> {
        let bytes = tokio::fs::read(task.artifact_path())
            .await
            .map_err(|source| UploadError::Read {
                path: task.artifact_path().to_path_buf(),
                source,
            })?;

        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .entry(task.remote_bucket().to_string())
            .or_default()
            .insert(task.remote_key().to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FunctionSpec;

    #[test]
    fn storage_config_defaults() {
        let config: StorageConfig = serde_json::from_value(serde_json::json!({
            "endpoint": "http://localhost:9000",
            "access_key": "minioadmin",
            "secret_key": "minioadmin",
        }))
        .unwrap();

        assert_eq!(config.region, "us-east-1");
        assert!(config.path_style);
    }

    #[tokio::test]
    async fn memory_uploader_stores_artifact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let task = PackagingTask::new(FunctionSpec {
            name: "f".to_string(),
            path: None,
            bucket: "bkt".to_string(),
            key_prefix: "p".to_string(),
            output_dir: Some(dir.path().to_path_buf()),
        })
        .unwrap();
        std::fs::write(task.artifact_path(), b"artifact bytes").unwrap();

        let uploader = MemoryUploader::new();
        uploader.upload(&task).await.unwrap();

        assert_eq!(
            uploader.object("bkt", "p/f.zip").as_deref(),
            Some(b"artifact bytes".as_ref())
        );
        assert_eq!(uploader.len(), 1);
    }

    #[tokio::test]
    async fn missing_artifact_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let task = PackagingTask::new(FunctionSpec {
            name: "f".to_string(),
            path: None,
            bucket: "bkt".to_string(),
            key_prefix: "p".to_string(),
            output_dir: Some(dir.path().to_path_buf()),
        })
        .unwrap();

        let err = MemoryUploader::new().upload(&task).await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }
}
