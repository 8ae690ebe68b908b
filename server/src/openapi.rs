use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::utils::ping,
        crate::api::audiobooks::list_audiobooks,
        crate::api::audiobooks::rescan_library,
        crate::api::tonies::list_creative_tonies,
        crate::api::upload::enqueue,
        crate::api::upload::status,
        crate::api::upload::queue
    ),
    components(
        schemas(
            crate::api::audiobooks::AudiobooksResponse,
            crate::api::audiobooks::RescanResponse,
            crate::api::tonies::ToniesResponse,
            crate::api::upload::UploadRequest,
            crate::api::upload::StatusResponse,
            crate::library::model::AudiobookSummary,
            crate::jobs::upload::UploadStatus,
            crate::jobs::upload::UploadTaskModel,
            crate::jobs::upload::UploadQueueModel,
            crate::tonie_cloud::Tonie
        )
    ),
    tags(
        (name = "audiobooks", description = "Audiobook catalog"),
        (name = "creativetonies", description = "Creative tonies on the account"),
        (name = "upload", description = "Upload queue and status"),
        (name = "utils", description = "Service utilities")
    )
)]
pub struct ApiDoc;
