//! Core library for the image upload/download server: configuration, storage,
//! route handlers and server lifecycle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod images;
pub mod middleware;
pub mod models;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use handlers::routes::create_routes;
pub use images::{ImageMetadata, ImageStorage, ImageValidator};

use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

/// Headroom over the file cap for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub storage: ImageStorage,
}

impl AppState {
    pub fn new(storage: ImageStorage) -> Self {
        Self {
            app_name: "Image Upload/Download API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ImageStorage::new(&config.storage))
    }
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: AppConfig) -> Router {
    let body_limit = usize::try_from(state.storage.validator().max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new().merge(create_routes());

    router = router.layer(DefaultBodyLimit::max(body_limit));

    router = router.layer(middleware::cors::cors_layer_from_config(&config.cors));

    router = router.layer(middleware::logging::logging_layer());

    router.with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
