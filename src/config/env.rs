use std::collections::HashMap;
use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    StorageBackend,
    S3Endpoint,
    S3Region,
    S3AccessKey,
    S3SecretKey,
    LocalStoreRoot,
    RawBucket,
    ProcessedBucket,
    RawStagingDir,
    ProcessedStagingDir,
    FfmpegPath,
    TargetHeight,
    TranscodeTimeoutSecs,
    TransferTimeoutSecs,
    MaxConcurrentJobs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::StorageBackend => "STORAGE_BACKEND",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::S3AccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::S3SecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::LocalStoreRoot => "LOCAL_STORE_ROOT",
            EnvKey::RawBucket => "RAW_VIDEO_BUCKET",
            EnvKey::ProcessedBucket => "PROCESSED_VIDEO_BUCKET",
            EnvKey::RawStagingDir => "RAW_STAGING_DIR",
            EnvKey::ProcessedStagingDir => "PROCESSED_STAGING_DIR",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::TargetHeight => "TARGET_HEIGHT",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::TransferTimeoutSecs => "TRANSFER_TIMEOUT_SECS",
            EnvKey::MaxConcurrentJobs => "MAX_CONCURRENT_JOBS",
        }
    }
}

/// Where configuration values are read from.
///
/// The process environment in production; a plain map in tests, so tests
/// never have to mutate global state.
pub trait Source {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Source for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl Source for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Empty strings count as unset.
pub fn get(source: &impl Source, key: EnvKey) -> Option<String> {
    source.var(key.as_str()).filter(|v| !v.trim().is_empty())
}

pub fn get_or(source: &impl Source, key: EnvKey, default: &str) -> String {
    get(source, key).unwrap_or_else(|| default.to_string())
}

pub fn get_parsed<T: FromStr>(source: &impl Source, key: EnvKey, default: T) -> T {
    match get(source, key) {
        Some(val) => val.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}
