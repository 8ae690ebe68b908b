use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde::Serialize;
use utoipa::{IntoParams, ToSchema};

use crate::api_error::ApiError;
use crate::jobs::upload::{
    UploadQueueModel, UploadStatus, UploadTask, UploadTaskModel, enqueue_upload, get_queue_status,
    get_upload_status,
};
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub(crate) struct UploadRequest {
    /// Creative tonie to upload onto
    tonie_id: String,
    /// Audiobook to upload
    audiobook_id: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct StatusQuery {
    /// Restrict the status lookup to one tonie
    tonie_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub(crate) struct StatusResponse {
    status: UploadStatus,
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    summary = "Enqueue an audiobook upload onto a creative tonie",
    request_body = UploadRequest,
    responses(
        (status = 202, description = "Upload accepted into the queue", body = UploadTaskModel),
        (status = 400, description = "Missing tonie or audiobook id")
    )
)]
pub(crate) async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadTaskModel>), ApiError> {
    if body.tonie_id.trim().is_empty() {
        return Err(ApiError::bad_request("tonie_id must not be empty"));
    }
    if body.audiobook_id.trim().is_empty() {
        return Err(ApiError::bad_request("audiobook_id must not be empty"));
    }
    // Existence is checked by the worker at resolution time, not here.
    let model = enqueue_upload(
        &state.upload_queue,
        UploadTask {
            tonie_id: body.tonie_id,
            audiobook_id: body.audiobook_id,
        },
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(model)))
}

#[utoipa::path(
    get,
    path = "/api/upload/status/{audiobook_id}",
    tag = "upload",
    summary = "Get the upload status for an audiobook",
    params(
        ("audiobook_id" = String, Path, description = "Audiobook id"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Current status, unknown for never-enqueued ids", body = StatusResponse)
    )
)]
pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
    Path(audiobook_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = get_upload_status(&state.upload_queue, audiobook_id, query.tonie_id).await?;
    Ok(Json(StatusResponse { status }))
}

#[utoipa::path(
    get,
    path = "/api/upload/queue",
    tag = "upload",
    summary = "Get the running upload and queued uploads",
    responses(
        (status = 200, description = "Queue contents", body = UploadQueueModel)
    )
)]
pub(crate) async fn queue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadQueueModel>, ApiError> {
    let model = get_queue_status(&state.upload_queue).await?;
    Ok(Json(model))
}
