use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::video::handler::process_video,
    ),
    components(
        schemas(
            crate::modules::video::dto::ProcessVideoRequest,
            crate::modules::video::dto::ProcessVideoResponse,
            crate::modules::video::dto::JobErrorBody,
            crate::modules::video::model::RemoteObjectRef,
            crate::modules::video::model::JobStage,
        )
    ),
    tags(
        (name = "Video", description = "Raw video transcoding and publishing")
    )
)]
pub struct ApiDoc;
