//! Object-storage adapter for the report bucket.
//!
//! The pipeline needs exactly two operations from storage: download a named
//! PDF, and find the most-recently-updated report when the caller does not
//! name one. Both are expressed over the `object_store` crate so the same
//! code serves a local directory in development and an S3 bucket in
//! production.
//!
//! The store is constructed once at startup and injected wherever it is
//! needed — never re-initialised ad hoc at call sites.

use crate::error::ReportError;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Storage handle for the report bucket.
pub struct ReportStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ReportStore {
    /// Local-filesystem store rooted at `dir`, for development and tests.
    pub fn local(dir: &std::path::Path) -> Result<Self, ReportError> {
        let canonical = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let store =
            LocalFileSystem::new_with_prefix(&canonical).map_err(|e| {
                ReportError::StorageUnavailable {
                    detail: format!("local filesystem error: {e}"),
                }
            })?;
        info!("Report store: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            bucket: canonical.display().to_string(),
        })
    }

    /// S3 store for `bucket`, with credentials and region from the
    /// environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// `AWS_DEFAULT_REGION`, optional `AWS_ENDPOINT`).
    pub fn s3(bucket: &str) -> Result<Self, ReportError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| ReportError::StorageUnavailable {
                detail: format!("S3 configuration error: {e}"),
            })?;
        info!("Report store: S3 backend, bucket '{bucket}'");
        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
        })
    }

    /// Wrap a pre-built object store (test injection point).
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Bucket name (or local root) for response `source` metadata.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Download one object's bytes.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ReportError> {
        let location = StorePath::from(path);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| ReportError::StorageUnavailable {
                detail: format!("download '{path}' failed: {e}"),
            })?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| ReportError::StorageUnavailable {
                detail: format!("read '{path}' failed: {e}"),
            })?;
        debug!("Downloaded '{}' ({} bytes)", path, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Path of the most-recently-updated object under `prefix`.
    ///
    /// This backs the storage-triggered entry point's "no path supplied"
    /// behaviour: the newest upload is almost always the report the user
    /// just dropped into the bucket.
    pub async fn latest(&self, prefix: &str) -> Result<String, ReportError> {
        let location = StorePath::from(prefix);
        let mut stream = self.store.list(Some(&location));

        let mut newest: Option<object_store::ObjectMeta> = None;
        while let Some(meta) =
            stream
                .try_next()
                .await
                .map_err(|e| ReportError::StorageUnavailable {
                    detail: format!("list '{prefix}' failed: {e}"),
                })?
        {
            let is_newer = newest
                .as_ref()
                .map(|n| meta.last_modified > n.last_modified)
                .unwrap_or(true);
            if is_newer {
                newest = Some(meta);
            }
        }

        let meta = newest.ok_or_else(|| ReportError::EmptyBucket {
            prefix: prefix.to_string(),
        })?;
        debug!(
            "Latest report under '{}': {} (modified {})",
            prefix, meta.location, meta.last_modified
        );
        Ok(meta.location.to_string())
    }
}
