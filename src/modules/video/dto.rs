use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::PipelineError;
use crate::modules::video::model::{JobReport, JobStage, RemoteObjectRef, VideoIdentifier, VideoRequest};

/// Either `identifier` alone, or `inputFilePath` together with `outputFilePath`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoRequest {
    #[validate(length(min = 1, max = 1024))]
    pub identifier: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub input_file_path: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub output_file_path: Option<String>,
}

impl ProcessVideoRequest {
    pub fn into_request(self) -> Result<VideoRequest, PipelineError> {
        self.validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;

        let (input, output) = match (self.identifier, self.input_file_path, self.output_file_path) {
            (Some(id), None, None) => (id.clone(), id),
            (None, Some(input), Some(output)) => (input, output),
            (None, _, _) => {
                return Err(PipelineError::Validation(
                    "Missing file path: provide `identifier` or both `inputFilePath` and `outputFilePath`"
                        .to_string(),
                ));
            }
            (Some(_), _, _) => {
                return Err(PipelineError::Validation(
                    "`identifier` cannot be combined with `inputFilePath`/`outputFilePath`".to_string(),
                ));
            }
        };

        let parse = |raw: String| {
            VideoIdentifier::parse(raw).map_err(|e| PipelineError::Validation(e.to_string()))
        };

        Ok(VideoRequest {
            input: parse(input)?,
            output: parse(output)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoResponse {
    pub job_id: Uuid,
    pub input: String,
    pub output: String,
    pub stage: JobStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<JobStage>,
    pub object: Option<RemoteObjectRef>,
    pub error: Option<JobErrorBody>,
    #[serde(with = "time::serde::iso8601")]
    pub started_at: OffsetDateTime,
    pub elapsed_ms: u64,
}

impl From<&JobReport> for ProcessVideoResponse {
    fn from(report: &JobReport) -> Self {
        let (object, error) = match &report.outcome {
            Ok(object) => (Some(object.clone()), None),
            Err(failure) => (
                None,
                Some(JobErrorBody {
                    kind: failure.error.kind().to_string(),
                    message: failure.error.to_string(),
                }),
            ),
        };

        Self {
            job_id: report.job_id,
            input: report.request.input.to_string(),
            output: report.request.output.to_string(),
            stage: report.stage(),
            failed_at: report.failed_at(),
            object,
            error,
            started_at: report.started_at,
            elapsed_ms: report.elapsed_ms,
        }
    }
}
