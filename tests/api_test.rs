mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{FakeEngine, PROCESSED_BUCKET, TestEnv, UploadFailingStore};
use video_processing_service::app::create_app;
use video_processing_service::config::settings::AppConfig;
use video_processing_service::infrastructure::storage::ObjectStore;
use video_processing_service::state::AppState;
use video_processing_service::workers::{PipelineSettings, VideoPipeline};

fn app_with(env: &TestEnv, pipeline: VideoPipeline) -> Router {
    let source: HashMap<String, String> = [("STORAGE_BACKEND", "local")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut config = AppConfig::from_source(&source).expect("Failed to build config");
    config.staging = env.staging.clone();

    create_app(AppState::new(config, Arc::new(pipeline)))
}

async fn test_app(env: &TestEnv) -> Router {
    let pipeline = env.pipeline(Arc::new(FakeEngine::succeeding())).await;
    app_with(env, pipeline)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn missing_file_path_is_rejected_before_any_work() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let (status, body) = post_json(app, "/api/v1/process-video", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("Missing file path"));
    assert!(body["data"].is_null());
    assert!(env.staged_files().is_empty());
}

#[tokio::test]
async fn path_traversal_is_rejected() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let (status, _) = post_json(
        app,
        "/api/v1/process-video",
        json!({ "inputFilePath": "../etc/passwd", "outputFilePath": "out.mp4" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn processed_video_is_reported_after_completion() {
    let env = TestEnv::new().await;
    env.seed_raw("clip1.mp4", b"raw-video").await;
    let app = test_app(&env).await;

    let (status, body) = post_json(
        app,
        "/api/v1/process-video",
        json!({ "identifier": "clip1.mp4" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let data = &body["data"];
    assert_eq!(data["stage"], "DONE");
    assert_eq!(data["object"]["bucket"], PROCESSED_BUCKET);
    assert_eq!(data["object"]["key"], "clip1.mp4");
    assert_eq!(data["object"]["public"], true);
    assert!(data["object"]["publicUrl"].as_str().unwrap().ends_with("clip1.mp4"));
    assert!(data["jobId"].is_string());
    assert!(data["error"].is_null());
    assert!(data.get("failedAt").is_none());

    // The response is only sent once cleanup has finished.
    assert!(env.staged_files().is_empty());
    assert!(env.store.is_public(PROCESSED_BUCKET, "clip1.mp4").await.unwrap());
}

#[tokio::test]
async fn missing_raw_object_maps_to_not_found() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let (status, body) = post_json(
        app,
        "/api/v1/process-video",
        json!({ "inputFilePath": "ghost.mp4", "outputFilePath": "ghost-720.mp4" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    let data = &body["data"];
    assert_eq!(data["stage"], "FAILED");
    assert_eq!(data["failedAt"], "DOWNLOADING");
    assert_eq!(data["error"]["kind"], "NotFoundError");
    assert!(data["object"].is_null());
    assert!(env.staged_files().is_empty());
}

#[tokio::test]
async fn upload_transfer_error_maps_to_bad_gateway() {
    let env = TestEnv::new().await;
    env.seed_raw("clip1.mp4", b"raw-video").await;
    let pipeline = env
        .pipeline_with(
            Arc::new(UploadFailingStore(env.store.clone())),
            Arc::new(FakeEngine::succeeding()),
            PipelineSettings::default(),
        )
        .await;
    let app = app_with(&env, pipeline);

    let (status, body) = post_json(
        app,
        "/api/v1/process-video",
        json!({ "identifier": "clip1.mp4" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let data = &body["data"];
    assert_eq!(data["failedAt"], "UPLOADING");
    assert_eq!(data["error"]["kind"], "TransferError");
    assert!(env.staged_files().is_empty());
}
