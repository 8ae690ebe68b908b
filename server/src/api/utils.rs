use axum::Json;
use utoipa::OpenApi;

#[utoipa::path(
    get,
    path = "/ping",
    tag = "utils",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub(crate) async fn ping() -> Json<&'static str> {
    Json("pong!")
}

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::openapi::ApiDoc::openapi())
}
