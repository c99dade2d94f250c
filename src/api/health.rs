use axum::{extract::State, response::IntoResponse};
use serde_json::json;

use super::error::ApiResult;
use super::response::success;
use super::AppState;

/// 健康检查端点
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let root = state.cache_service.config().storage_root();

    let storage_status = match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => "available",
        Ok(_) => "not_a_directory",
        Err(e) => {
            tracing::warn!("Storage root unavailable: {:?} - {}", root, e);
            "missing"
        }
    };

    Ok(success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "storage_root": root.display().to_string(),
        "storage": storage_status
    })))
}
