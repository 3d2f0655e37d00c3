use super::dto::{ProcessVideoRequest, ProcessVideoResponse};
use super::service::VideoService;
use crate::common::response::{ApiError, ApiFailure, ApiResponse, ApiSuccess};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// Transcode a raw video and publish the result
///
/// Responds only once download, transcode, upload and cleanup have settled.
#[utoipa::path(
    post,
    path = "/api/v1/process-video",
    request_body = ProcessVideoRequest,
    responses(
        (status = 200, description = "Video processed and published", body = ApiResponse<ProcessVideoResponse>),
        (status = 400, description = "Bad Request: missing or invalid file path"),
        (status = 404, description = "Raw video not found", body = ApiResponse<ProcessVideoResponse>),
        (status = 500, description = "Transcoding failed", body = ApiResponse<ProcessVideoResponse>),
        (status = 502, description = "Transfer failed or video uploaded but not published", body = ApiResponse<ProcessVideoResponse>),
        (status = 504, description = "Stage timed out", body = ApiResponse<ProcessVideoResponse>)
    ),
    tag = "Video"
)]
pub async fn process_video(
    State(state): State<AppState>,
    Json(payload): Json<ProcessVideoRequest>,
) -> impl IntoResponse {
    let report = match VideoService::process(state, payload).await {
        Ok(report) => report,
        Err(e) => return ApiError(e.to_string(), e.status_code()).into_response(),
    };

    let body = ProcessVideoResponse::from(&report);
    match &report.outcome {
        Ok(_) => ApiSuccess(
            ApiResponse::success(body, "Video processed successfully"),
            StatusCode::OK,
        )
        .into_response(),
        Err(failure) => ApiFailure(
            ApiResponse::failure(body, &failure.to_string()),
            failure.error.status_code(),
        )
        .into_response(),
    }
}
