use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::infrastructure::storage::StorageError;
use crate::infrastructure::transcoder::TranscodeError;

/// Caller-facing failure taxonomy of a pipeline run.
///
/// Cleanup failures are absent: they are logged and never
/// reach the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("object '{key}' uploaded to bucket '{bucket}' but could not be made public: {reason}")]
    PartialPublish {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::NotFound { .. } => "NotFoundError",
            PipelineError::Transfer(_) => "TransferError",
            PipelineError::Transcode(TranscodeError::TimedOut(_)) => "TimeoutError",
            PipelineError::Transcode(_) => "TranscodeError",
            PipelineError::PartialPublish { .. } => "PartialPublishError",
            PipelineError::TimedOut { .. } => "TimeoutError",
            PipelineError::Unavailable(_) => "UnavailableError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::Transfer(_) | PipelineError::PartialPublish { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PipelineError::Transcode(TranscodeError::TimedOut(_))
            | PipelineError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Transcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { bucket, key } => PipelineError::NotFound { bucket, key },
            StorageError::UploadedButNotPublished {
                bucket,
                key,
                reason,
            } => PipelineError::PartialPublish {
                bucket,
                key,
                reason,
            },
            other => PipelineError::Transfer(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_distinct_kinds() {
        let not_found: PipelineError = StorageError::NotFound {
            bucket: "raw-videos".into(),
            key: "missing.mp4".into(),
        }
        .into();
        assert_eq!(not_found.kind(), "NotFoundError");
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let partial: PipelineError = StorageError::UploadedButNotPublished {
            bucket: "processed-videos".into(),
            key: "clip1.mp4".into(),
            reason: "AccessDenied".into(),
        }
        .into();
        assert_eq!(partial.kind(), "PartialPublishError");

        let transfer: PipelineError =
            StorageError::Transfer("connection reset".into()).into();
        assert_eq!(transfer.kind(), "TransferError");
        assert_eq!(transfer.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn engine_timeout_reports_as_timeout() {
        let err = PipelineError::from(TranscodeError::TimedOut(Duration::from_secs(5)));
        assert_eq!(err.kind(), "TimeoutError");
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
