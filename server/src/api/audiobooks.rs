use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api_error::ApiError;
use crate::library::model::AudiobookSummary;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub(crate) struct AudiobooksResponse {
    audiobooks: Vec<AudiobookSummary>,
}

#[derive(Serialize, ToSchema)]
pub(crate) struct RescanResponse {
    detail: String,
}

#[utoipa::path(
    get,
    path = "/api/audiobooks",
    tag = "audiobooks",
    summary = "List the current audiobook catalog",
    responses(
        (status = 200, description = "Current catalog snapshot", body = AudiobooksResponse)
    )
)]
pub(crate) async fn list_audiobooks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AudiobooksResponse>, ApiError> {
    let covers_dir = &state.settings.library.covers_dir;
    let audiobooks = state
        .catalog
        .current()
        .iter()
        .map(|book| book.summary(covers_dir))
        .collect();
    Ok(Json(AudiobooksResponse { audiobooks }))
}

#[utoipa::path(
    post,
    path = "/api/audiobooks/rescan",
    tag = "audiobooks",
    summary = "Rescan the audiobook library",
    responses(
        (status = 202, description = "Rescan started or coalesced into a running one", body = RescanResponse)
    )
)]
pub(crate) async fn rescan_library(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RescanResponse>) {
    let started = state.rescanner.trigger();
    let detail = if started {
        "rescan started"
    } else {
        "rescan already in progress"
    };
    (
        StatusCode::ACCEPTED,
        Json(RescanResponse {
            detail: detail.to_string(),
        }),
    )
}
