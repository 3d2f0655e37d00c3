use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod remote;
pub mod s3;

pub use local::LocalObjectStore;
pub use remote::RemoteStore;
pub use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to change object visibility: {0}")]
    Visibility(String),

    #[error("object '{key}' uploaded to bucket '{bucket}' but not made public: {reason}")]
    UploadedButNotPublished {
        bucket: String,
        key: String,
        reason: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Remote blob store with bucket semantics.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch `bucket/key` into `dest`, returning the byte count.
    ///
    /// On return `dest` either holds the complete object or does not exist.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Store the file at `source` as `bucket/key`. The object is private.
    async fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<u64>;

    async fn make_public(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Sibling path a download is written to before it is moved into place.
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Moves a finished download into place, or removes the partial file.
pub(crate) async fn finish_download(
    part: &Path,
    dest: &Path,
    written: std::io::Result<u64>,
) -> StorageResult<u64> {
    match written {
        Ok(bytes) => {
            if let Err(e) = tokio::fs::rename(part, dest).await {
                let _ = tokio::fs::remove_file(part).await;
                return Err(StorageError::Io(e));
            }
            Ok(bytes)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(part).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %part.display(), error = %cleanup, "Failed to remove partial download");
                }
            }
            Err(StorageError::Transfer(e.to_string()))
        }
    }
}
