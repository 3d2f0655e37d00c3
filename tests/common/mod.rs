#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use video_processing_service::config::settings::{BucketConfig, StagingConfig};
use video_processing_service::infrastructure::staging::LocalStaging;
use video_processing_service::infrastructure::storage::{
    LocalObjectStore, ObjectStore, RemoteStore, StorageError, StorageResult,
};
use video_processing_service::infrastructure::transcoder::{
    TranscodeEngine, TranscodeError, TranscodeJob,
};
use video_processing_service::workers::{PipelineSettings, VideoPipeline};

pub const RAW_BUCKET: &str = "raw-videos";
pub const PROCESSED_BUCKET: &str = "processed-videos";

/// Stands in for ffmpeg: copies input to output, optionally failing.
#[derive(Default)]
pub struct FakeEngine {
    fail_with: Option<String>,
    output_as_directory: bool,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<PathBuf>>,
}

impl FakeEngine {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Fails after leaving a directory at the output path, which staging
    /// cleanup cannot remove.
    pub fn failing_with_directory_output(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            output_as_directory: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(job.input.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match &self.fail_with {
            Some(message) => {
                if self.output_as_directory {
                    tokio::fs::create_dir_all(job.output.join("segments")).await?;
                } else {
                    // Engines often leave a truncated output behind.
                    tokio::fs::write(&job.output, b"truncated").await?;
                }
                Err(TranscodeError::Failed {
                    status: "exit status: 1".to_string(),
                    message: message.clone(),
                })
            }
            None => {
                let raw = tokio::fs::read(&job.input).await?;
                let mut out = b"scaled:".to_vec();
                out.extend_from_slice(&raw);
                tokio::fs::write(&job.output, out).await?;
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Local store whose visibility change always fails.
pub struct AclDeniedStore(pub LocalObjectStore);

#[async_trait]
impl ObjectStore for AclDeniedStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        self.0.download(bucket, key, dest).await
    }

    async fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<u64> {
        self.0.upload(bucket, key, source).await
    }

    async fn make_public(&self, _bucket: &str, _key: &str) -> StorageResult<()> {
        Err(StorageError::Visibility("AccessDenied".to_string()))
    }

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.0.is_public(bucket, key).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.0.public_url(bucket, key)
    }
}

/// Local store whose uploads fail mid-transfer.
pub struct UploadFailingStore(pub LocalObjectStore);

#[async_trait]
impl ObjectStore for UploadFailingStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        self.0.download(bucket, key, dest).await
    }

    async fn upload(&self, _bucket: &str, _key: &str, _source: &Path) -> StorageResult<u64> {
        Err(StorageError::Transfer("connection reset by peer".to_string()))
    }

    async fn make_public(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.0.make_public(bucket, key).await
    }

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.0.is_public(bucket, key).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.0.public_url(bucket, key)
    }
}

/// Store whose downloads never finish.
pub struct StalledStore(pub LocalObjectStore);

#[async_trait]
impl ObjectStore for StalledStore {
    async fn download(&self, _bucket: &str, _key: &str, _dest: &Path) -> StorageResult<u64> {
        std::future::pending().await
    }

    async fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<u64> {
        self.0.upload(bucket, key, source).await
    }

    async fn make_public(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.0.make_public(bucket, key).await
    }

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.0.is_public(bucket, key).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.0.public_url(bucket, key)
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub store: LocalObjectStore,
    pub staging: StagingConfig,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = LocalObjectStore::new(dir.path().join("object-store"))
            .await
            .expect("Failed to create local object store");
        let staging = StagingConfig {
            raw_dir: dir.path().join("raw-videos"),
            processed_dir: dir.path().join("processed-videos"),
        };

        Self {
            dir,
            store,
            staging,
        }
    }

    pub async fn seed_raw(&self, key: &str, data: &[u8]) {
        self.store
            .put_bytes(RAW_BUCKET, key, data)
            .await
            .expect("Failed to seed raw bucket");
    }

    pub fn buckets() -> BucketConfig {
        BucketConfig {
            raw: RAW_BUCKET.to_string(),
            processed: PROCESSED_BUCKET.to_string(),
        }
    }

    pub async fn pipeline_with(
        &self,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranscodeEngine>,
        settings: PipelineSettings,
    ) -> VideoPipeline {
        let staging = LocalStaging::new(self.staging.clone());
        staging
            .ensure_directories()
            .await
            .expect("Failed to create staging directories");

        VideoPipeline::new(
            staging,
            RemoteStore::new(store, Self::buckets()),
            engine,
            settings,
        )
    }

    pub async fn pipeline(&self, engine: Arc<dyn TranscodeEngine>) -> VideoPipeline {
        self.pipeline_with(
            Arc::new(self.store.clone()),
            engine,
            PipelineSettings::default(),
        )
        .await
    }

    /// Names of every file left in either staging directory.
    pub fn staged_files(&self) -> Vec<String> {
        [&self.staging.raw_dir, &self.staging.processed_dir]
            .into_iter()
            .filter_map(|dir| std::fs::read_dir(dir).ok())
            .flat_map(|entries| entries.filter_map(Result::ok))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }
}
