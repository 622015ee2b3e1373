//! Route table

use axum::{
    routing::{get, post},
    Router,
};

use super::{health, images};
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::handle_health))
        .route("/square", get(images::square))
        .nest("/images", create_image_routes())
}

pub fn create_image_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(images::upload_image))
        .route("/download/:filename", get(images::download_image))
}
