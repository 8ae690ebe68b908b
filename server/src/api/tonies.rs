use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::tonie_cloud::Tonie;

#[derive(Serialize, ToSchema)]
pub(crate) struct ToniesResponse {
    creativetonies: Vec<Tonie>,
}

#[utoipa::path(
    get,
    path = "/api/creativetonies",
    tag = "creativetonies",
    summary = "List the creative tonies on the account",
    responses(
        (status = 200, description = "Current tonie list snapshot", body = ToniesResponse)
    )
)]
pub(crate) async fn list_creative_tonies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ToniesResponse>, ApiError> {
    let creativetonies = state.tonies.current().iter().cloned().collect();
    Ok(Json(ToniesResponse { creativetonies }))
}
