use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{
    services::{
        cancel_job, download_video, get_status, health, index, stream_video, submit_job,
    },
    state::AppState,
};
use crate::config::Config;
use crate::extractor::WebDriverFactory;
use crate::observability::Metrics;
use crate::orchestrator::Orchestrator;
use crate::registry::TaskRegistry;
use crate::resolver::CobaltResolver;
use crate::worker::HttpClient;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes and middleware, without binding a socket
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/scrape-and-download/", post(submit_job))
        .route("/get-status/", get(get_status))
        .route("/cancel/", post(cancel_job))
        .route("/videos/{subfolder}/{filename}", get(download_video))
        .route("/stream/videos/{subfolder}/{filename}", get(stream_video))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                // Handles Content-Encoding transparently before handlers see the body
                .layer(RequestDecompressionLayer::new()),
        )
}

pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    let http = HttpClient::new(&config.fetch)?;
    let factory = WebDriverFactory::new(config.extractor.clone())?;
    let resolver = CobaltResolver::new(http.client().clone(), config.resolver.base_url.clone());
    info!(
        webdriver = %config.extractor.webdriver_url,
        resolver = %config.resolver.base_url,
        videos_dir = %config.server.videos_dir.display(),
        "Job backends configured"
    );

    let registry = TaskRegistry::new();
    let metrics = Arc::new(Metrics::new());
    let orchestrator = Orchestrator::new(
        &config,
        registry.clone(),
        metrics.clone(),
        Arc::new(factory),
        Arc::new(resolver),
        http,
    );

    let state = AppState::new(config, registry, orchestrator.clone(), metrics);
    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "clipscout API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            orchestrator.shutdown();
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
