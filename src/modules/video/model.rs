use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::PipelineError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("video identifier must not be empty")]
    Empty,

    #[error("video identifier '{0}' must not contain path separators")]
    PathSeparator(String),

    #[error("video identifier '{0}' is not a valid file name")]
    Reserved(String),

    #[error("video identifier must not contain control characters")]
    ControlCharacter,
}

/// Name of a video, shared by the raw object key, the processed object key
/// and the local staging file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoIdentifier(String);

impl VideoIdentifier {
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierError> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(IdentifierError::PathSeparator(trimmed.to_string()));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(IdentifierError::Reserved(trimmed.to_string()));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdentifierError::ControlCharacter);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<VideoIdentifier> for String {
    fn from(id: VideoIdentifier) -> Self {
        id.0
    }
}

impl fmt::Display for VideoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated request to run the pipeline once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Key in the raw bucket.
    pub input: VideoIdentifier,
    /// Key in the processed bucket.
    pub output: VideoIdentifier,
}

impl VideoRequest {
    pub fn same_name(id: VideoIdentifier) -> Self {
        Self {
            input: id.clone(),
            output: id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectRef {
    pub bucket: String,
    pub key: String,
    pub public: bool,
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStage {
    Received,
    Downloading,
    Downloaded,
    Transcoding,
    Transcoded,
    Uploading,
    Uploaded,
    Cleaning,
    Done,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Received => "RECEIVED",
            JobStage::Downloading => "DOWNLOADING",
            JobStage::Downloaded => "DOWNLOADED",
            JobStage::Transcoding => "TRANSCODING",
            JobStage::Transcoded => "TRANSCODED",
            JobStage::Uploading => "UPLOADING",
            JobStage::Uploaded => "UPLOADED",
            JobStage::Cleaning => "CLEANING",
            JobStage::Done => "DONE",
            JobStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// A stage failure. `stage` is where the job was when it failed.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct JobFailure {
    pub stage: JobStage,
    #[source]
    pub error: PipelineError,
}

/// Terminal result of one pipeline run, produced after cleanup settled.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: Uuid,
    pub request: VideoRequest,
    pub outcome: Result<RemoteObjectRef, JobFailure>,
    pub started_at: OffsetDateTime,
    pub elapsed_ms: u64,
}

impl JobReport {
    pub fn stage(&self) -> JobStage {
        match self.outcome {
            Ok(_) => JobStage::Done,
            Err(_) => JobStage::Failed,
        }
    }

    pub fn failed_at(&self) -> Option<JobStage> {
        self.outcome.as_ref().err().map(|f| f.stage)
    }
}
