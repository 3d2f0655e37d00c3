use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::info;

use super::{ObjectStore, StorageError, StorageResult, finish_download, partial_path};

/// Directory holding empty marker files for publicly readable objects.
const PUBLIC_MARKERS: &str = ".public";

const COPY_CHUNK_BYTES: usize = 256 * 1024;

/// Object store on the local filesystem: `<root>/<bucket>/<key>`.
///
/// Used for development without an S3 endpoint and by the test suite.
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn marker_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(PUBLIC_MARKERS).join(bucket).join(key)
    }

    /// Places `data` at `bucket/key` directly, bypassing the upload path.
    pub async fn put_bytes(&self, bucket: &str, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    pub async fn exists(&self, bucket: &str, key: &str) -> bool {
        fs::try_exists(self.object_path(bucket, key))
            .await
            .unwrap_or(false)
    }
}

/// Streams `from` into `to` chunk by chunk. Dropping the future stops the
/// write, unlike `fs::copy`, which runs to completion on the blocking pool.
async fn copy_chunked(from: &Path, to: &Path) -> std::io::Result<u64> {
    let mut reader = BufReader::with_capacity(COPY_CHUNK_BYTES, fs::File::open(from).await?);
    let mut writer = fs::File::create(to).await?;
    let bytes = tokio::io::copy_buf(&mut reader, &mut writer).await?;
    writer.flush().await?;
    Ok(bytes)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        let source = self.object_path(bucket, key);

        if !fs::try_exists(&source).await? {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let part = partial_path(dest);
        let written = copy_chunked(&source, &part).await;
        let bytes = finish_download(&part, dest, written).await?;

        info!(bucket, key, dest = %dest.display(), size_bytes = bytes, "Object downloaded");
        Ok(bytes)
    }

    async fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<u64> {
        let target = self.object_path(bucket, key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let bytes = fs::copy(source, &target)
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?;

        // A fresh upload replaces the object, including its visibility.
        match fs::remove_file(self.marker_path(bucket, key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        info!(bucket, key, size_bytes = bytes, "Object uploaded");
        Ok(bytes)
    }

    async fn make_public(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if !self.exists(bucket, key).await {
            return Err(StorageError::Visibility(format!(
                "object '{}' does not exist in bucket '{}'",
                key, bucket
            )));
        }

        let marker = self.marker_path(bucket, key);
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&marker, b"")
            .await
            .map_err(|e| StorageError::Visibility(e.to_string()))?;

        Ok(())
    }

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(fs::try_exists(self.marker_path(bucket, key)).await?)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("file://{}", self.object_path(bucket, key).display())
    }
}
