use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use super::{ObjectStore, StorageError, StorageResult};
use crate::config::settings::BucketConfig;
use crate::modules::video::model::{RemoteObjectRef, VideoIdentifier};

/// Raw-bucket reads and processed-bucket publishes on top of an [`ObjectStore`].
#[derive(Clone)]
pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
    buckets: BucketConfig,
}

impl RemoteStore {
    pub fn new(store: Arc<dyn ObjectStore>, buckets: BucketConfig) -> Self {
        Self { store, buckets }
    }

    pub fn buckets(&self) -> &BucketConfig {
        &self.buckets
    }

    pub async fn download_raw(&self, id: &VideoIdentifier, dest: &Path) -> StorageResult<u64> {
        self.store.download(&self.buckets.raw, id.as_str(), dest).await
    }

    /// Uploads `source` as `id` and makes it publicly readable.
    ///
    /// An upload whose visibility change fails is reported as
    /// [`StorageError::UploadedButNotPublished`]; the object then exists but
    /// is private.
    pub async fn upload_processed(
        &self,
        id: &VideoIdentifier,
        source: &Path,
    ) -> StorageResult<RemoteObjectRef> {
        let bucket = &self.buckets.processed;
        let key = id.as_str();

        self.store.upload(bucket, key, source).await?;

        if let Err(e) = self.store.make_public(bucket, key).await {
            error!(bucket = %bucket, key, error = %e, "Uploaded object could not be made public");
            return Err(StorageError::UploadedButNotPublished {
                bucket: bucket.clone(),
                key: key.to_string(),
                reason: e.to_string(),
            });
        }

        info!(bucket = %bucket, key, "Processed video published");

        Ok(RemoteObjectRef {
            bucket: bucket.clone(),
            key: key.to_string(),
            public: true,
            public_url: self.store.public_url(bucket, key),
        })
    }

    pub async fn is_processed_public(&self, id: &VideoIdentifier) -> StorageResult<bool> {
        self.store.is_public(&self.buckets.processed, id.as_str()).await
    }
}
