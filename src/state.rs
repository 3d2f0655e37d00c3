use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::settings::{AppConfig, StorageBackend};
use crate::infrastructure::staging::LocalStaging;
use crate::infrastructure::storage::{LocalObjectStore, ObjectStore, RemoteStore, S3Store};
use crate::infrastructure::transcoder::{FfmpegTranscoder, TranscodeEngine};
use crate::workers::{PipelineSettings, VideoPipeline};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<VideoPipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<VideoPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Wires the production components and prepares the staging directories.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match &config.storage {
            StorageBackend::S3 {
                endpoint,
                region,
                access_key,
                secret_key,
            } => Arc::new(S3Store::new(
                endpoint.as_deref(),
                region,
                access_key,
                secret_key,
            )),
            StorageBackend::Local { root } => Arc::new(
                LocalObjectStore::new(root.clone())
                    .await
                    .with_context(|| format!("Failed to open local object store at {}", root.display()))?,
            ),
        };

        let staging = LocalStaging::new(config.staging.clone());
        staging
            .ensure_directories()
            .await
            .context("Failed to create staging directories")?;

        let engine: Arc<dyn TranscodeEngine> = Arc::new(FfmpegTranscoder::new(&config.transcode));
        let remote = RemoteStore::new(store, config.buckets.clone());
        let pipeline = VideoPipeline::new(
            staging,
            remote,
            engine,
            PipelineSettings::from_config(&config),
        );

        Ok(Self::new(config, Arc::new(pipeline)))
    }
}
