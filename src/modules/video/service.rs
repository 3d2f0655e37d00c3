use super::dto::ProcessVideoRequest;
use super::model::JobReport;
use crate::common::error::PipelineError;
use crate::state::AppState;

pub struct VideoService;

impl VideoService {
    /// Validates the request, then awaits the whole pipeline.
    ///
    /// `Err` is returned only for requests rejected before any work started;
    /// pipeline failures are carried inside the report.
    pub async fn process(
        state: AppState,
        payload: ProcessVideoRequest,
    ) -> Result<JobReport, PipelineError> {
        let request = payload.into_request()?;
        Ok(state.pipeline.run(request).await)
    }
}
