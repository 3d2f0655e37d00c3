use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::env::{self, EnvKey, ProcessEnv, Source};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("unknown storage backend '{0}', expected 's3' or 'local'")]
    UnknownBackend(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageBackend {
    S3 {
        endpoint: Option<String>,
        region: String,
        access_key: String,
        secret_key: String,
    },
    Local {
        root: PathBuf,
    },
}

/// Names of the two remote buckets.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BucketConfig {
    pub raw: String,
    pub processed: String,
}

/// Roots of the local scratch area.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct StagingConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TranscodeConfig {
    pub ffmpeg_path: PathBuf,
    pub target_height: u32,
    pub timeout: Duration,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub storage: StorageBackend,
    pub buckets: BucketConfig,
    pub staging: StagingConfig,
    pub transcode: TranscodeConfig,
    pub transfer_timeout: Duration,
    pub max_concurrent_jobs: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl Source) -> Result<Self, ConfigError> {
        let storage = match env::get_or(source, EnvKey::StorageBackend, "s3")
            .to_ascii_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3 {
                endpoint: env::get(source, EnvKey::S3Endpoint),
                region: env::get_or(source, EnvKey::S3Region, "us-east-1"),
                access_key: env::get(source, EnvKey::S3AccessKey)
                    .ok_or(ConfigError::Missing(EnvKey::S3AccessKey.as_str()))?,
                secret_key: env::get(source, EnvKey::S3SecretKey)
                    .ok_or(ConfigError::Missing(EnvKey::S3SecretKey.as_str()))?,
            },
            "local" => StorageBackend::Local {
                root: env::get_or(source, EnvKey::LocalStoreRoot, "./object-store").into(),
            },
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        // ffmpeg reads a zero height as "keep the input height".
        let target_height: u32 = env::get_parsed(source, EnvKey::TargetHeight, 720);
        if target_height == 0 {
            return Err(ConfigError::Invalid {
                key: EnvKey::TargetHeight.as_str(),
                reason: "must be greater than zero",
            });
        }

        Ok(Self {
            server_port: env::get_parsed(source, EnvKey::ServerPort, 3000),
            storage,
            buckets: BucketConfig {
                raw: env::get_or(source, EnvKey::RawBucket, "raw-videos"),
                processed: env::get_or(source, EnvKey::ProcessedBucket, "processed-videos"),
            },
            staging: StagingConfig {
                raw_dir: env::get_or(source, EnvKey::RawStagingDir, "./raw-videos").into(),
                processed_dir: env::get_or(source, EnvKey::ProcessedStagingDir, "./processed-videos")
                    .into(),
            },
            transcode: TranscodeConfig {
                ffmpeg_path: env::get_or(source, EnvKey::FfmpegPath, "ffmpeg").into(),
                target_height,
                timeout: Duration::from_secs(env::get_parsed(
                    source,
                    EnvKey::TranscodeTimeoutSecs,
                    3600,
                )),
            },
            transfer_timeout: Duration::from_secs(env::get_parsed(
                source,
                EnvKey::TransferTimeoutSecs,
                900,
            )),
            max_concurrent_jobs: env::get_parsed(source, EnvKey::MaxConcurrentJobs, 2usize).max(1),
        })
    }
}
