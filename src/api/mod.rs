pub mod download;
pub mod error;
pub mod health;
pub mod response;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::services::CacheService;

#[derive(Clone)]
pub struct AppState {
    pub cache_service: Arc<CacheService>,
}

/// 构建应用路由
pub fn router(state: AppState) -> Router {
    let upload_limit = state.cache_service.config().upload_limit_bytes();

    Router::new()
        .route("/", get(|| async { "Manga Image Cache Gateway" }))
        .route("/api/health", get(health::health_check))
        .route("/download", get(download::download_image))
        .route("/upload", post(upload::upload_file))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
