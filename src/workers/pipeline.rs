use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::common::error::PipelineError;
use crate::config::settings::AppConfig;
use crate::infrastructure::staging::{JobPaths, LocalStaging};
use crate::infrastructure::storage::{RemoteStore, StorageResult, partial_path};
use crate::infrastructure::transcoder::{ScalingSpec, TranscodeEngine, TranscodeJob};
use crate::modules::video::model::{JobFailure, JobReport, JobStage, RemoteObjectRef, VideoRequest};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scaling: ScalingSpec,
    pub transfer_timeout: Duration,
    pub max_concurrent_jobs: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scaling: ScalingSpec::new(config.transcode.target_height),
            transfer_timeout: config.transfer_timeout,
            max_concurrent_jobs: config.max_concurrent_jobs,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scaling: ScalingSpec::default(),
            transfer_timeout: Duration::from_secs(900),
            max_concurrent_jobs: 2,
        }
    }
}

/// Download → transcode → upload → cleanup, one stage at a time per job.
pub struct VideoPipeline {
    staging: LocalStaging,
    store: RemoteStore,
    engine: Arc<dyn TranscodeEngine>,
    settings: PipelineSettings,
    limiter: Arc<Semaphore>,
}

impl VideoPipeline {
    pub fn new(
        staging: LocalStaging,
        store: RemoteStore,
        engine: Arc<dyn TranscodeEngine>,
        settings: PipelineSettings,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1)));
        Self {
            staging,
            store,
            engine,
            settings,
            limiter,
        }
    }

    pub fn staging(&self) -> &LocalStaging {
        &self.staging
    }

    pub fn store(&self) -> &RemoteStore {
        &self.store
    }

    /// Free job slots right now.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Runs one job to completion. Returns only after cleanup has settled.
    pub async fn run(&self, request: VideoRequest) -> JobReport {
        let job_id = Uuid::new_v4();
        let started_at = OffsetDateTime::now_utc();
        let clock = Instant::now();

        info!(
            %job_id,
            input = %request.input,
            output = %request.output,
            stage = %JobStage::Received,
            "Job received"
        );

        let outcome = match self.limiter.clone().acquire_owned().await {
            Ok(_permit) => {
                let paths = self.staging.job_paths(job_id, &request);
                let outcome = self.execute(job_id, &request, &paths).await;
                self.cleanup(job_id, &paths).await;
                outcome
            }
            Err(_) => Err(JobFailure {
                stage: JobStage::Received,
                error: PipelineError::Unavailable("job limiter is closed".to_string()),
            }),
        };

        let elapsed_ms = clock.elapsed().as_millis() as u64;
        match &outcome {
            Ok(object) => info!(
                %job_id,
                stage = %JobStage::Done,
                bucket = %object.bucket,
                key = %object.key,
                elapsed_ms,
                "Job finished"
            ),
            Err(failure) => error!(
                %job_id,
                stage = %JobStage::Failed,
                failed_at = %failure.stage,
                kind = failure.error.kind(),
                error = %failure.error,
                elapsed_ms,
                "Job failed"
            ),
        }

        JobReport {
            job_id,
            request,
            outcome,
            started_at,
            elapsed_ms,
        }
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: &VideoRequest,
        paths: &JobPaths,
    ) -> Result<RemoteObjectRef, JobFailure> {
        enter(job_id, JobStage::Downloading);
        self.bounded(
            JobStage::Downloading,
            "download",
            self.store.download_raw(&request.input, &paths.raw),
        )
        .await?;
        enter(job_id, JobStage::Downloaded);

        enter(job_id, JobStage::Transcoding);
        let job = TranscodeJob {
            job_id,
            input: paths.raw.clone(),
            output: paths.processed.clone(),
            scaling: self.settings.scaling,
        };
        self.engine
            .transcode(&job)
            .await
            .map_err(|e| JobFailure {
                stage: JobStage::Transcoding,
                error: e.into(),
            })?;
        enter(job_id, JobStage::Transcoded);

        enter(job_id, JobStage::Uploading);
        let object = self
            .bounded(
                JobStage::Uploading,
                "upload",
                self.store.upload_processed(&request.output, &paths.processed),
            )
            .await?;
        enter(job_id, JobStage::Uploaded);

        Ok(object)
    }

    async fn bounded<T>(
        &self,
        stage: JobStage,
        operation: &'static str,
        transfer: impl Future<Output = StorageResult<T>>,
    ) -> Result<T, JobFailure> {
        let limit = self.settings.transfer_timeout;
        match tokio::time::timeout(limit, transfer).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(JobFailure {
                stage,
                error: e.into(),
            }),
            Err(_) => Err(JobFailure {
                stage,
                error: PipelineError::TimedOut {
                    operation,
                    after: limit,
                },
            }),
        }
    }

    /// Best effort: failures are logged and never change the job outcome.
    async fn cleanup(&self, job_id: Uuid, paths: &JobPaths) {
        enter(job_id, JobStage::Cleaning);

        // An interrupted download can leave its partial file behind.
        let raw_part = partial_path(&paths.raw);
        for path in [&paths.raw, &raw_part, &paths.processed] {
            if let Err(e) = self.staging.delete_if_present(path).await {
                warn!(
                    %job_id,
                    path = %path.display(),
                    error = %e,
                    "Failed to delete staged file"
                );
            }
        }
    }
}

fn enter(job_id: Uuid, stage: JobStage) {
    debug!(%job_id, %stage, "Stage transition");
}
