mod api;
mod api_error;
mod config;
mod jobs;
mod library;
mod openapi;
mod state;
#[cfg(test)]
mod test_utils;
mod tonie_cloud;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use std::{env, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::library::rescan::LibraryRescanner;
use crate::library::store::SnapshotStore;
use crate::state::AppState;
use crate::tonie_cloud::{TonieCloudApi, TonieCloudClient};

#[derive(Parser, Debug)]
#[command(
    name = "tonie-audio-server",
    about = "Audiobook library and creative tonie sync server"
)]
struct Args {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| env::var(config::CONFIG_PATH_ENV).ok().map(PathBuf::from));
    let settings = Arc::new(config::Settings::load(config_path)?);

    let cloud: Arc<dyn TonieCloudApi> = Arc::new(TonieCloudClient::new(&settings.tonie_cloud)?);

    let catalog = Arc::new(SnapshotStore::default());
    let tonies = Arc::new(SnapshotStore::default());

    let rescanner = Arc::new(LibraryRescanner::new(
        &settings.library,
        Arc::clone(&catalog),
    ));
    rescanner.trigger();

    let (upload_queue, queue_handle) = jobs::upload::spawn_upload_queue(
        Arc::clone(&catalog),
        Arc::clone(&tonies),
        Arc::clone(&cloud),
    )
    .await?;
    let (tonie_refresher, refresher_handle) = jobs::tonies::spawn_tonie_refresher(
        Arc::clone(&tonies),
        Arc::clone(&cloud),
        settings.tonie_cloud.refresh_interval(),
    )
    .await?;

    let app_state = Arc::new(AppState {
        settings: Arc::clone(&settings),
        catalog,
        tonies,
        rescanner,
        upload_queue: upload_queue.clone(),
    });

    let app = Router::new()
        .route("/ping", get(api::utils::ping))
        .route("/openapi.json", get(api::utils::openapi_json))
        .route("/api/audiobooks", get(api::audiobooks::list_audiobooks))
        .route("/api/audiobooks/rescan", post(api::audiobooks::rescan_library))
        .route("/api/creativetonies", get(api::tonies::list_creative_tonies))
        .route("/api/upload", post(api::upload::enqueue))
        .route("/api/upload/queue", get(api::upload::queue))
        .route("/api/upload/status/{audiobook_id}", get(api::upload::status))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listen_addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let any in-flight upload finish before exiting.
    jobs::upload::shutdown_upload_queue(&upload_queue).await;
    let _ = queue_handle.await;
    tonie_refresher.stop(None);
    let _ = refresher_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
