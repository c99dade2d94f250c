use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use manga_cache_backend::api::{self, AppState};
use manga_cache_backend::services::{CacheConfig, CacheService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    // 进程内只读取一次配置
    let config = Arc::new(CacheConfig::from_env());
    tokio::fs::create_dir_all(config.storage_root())
        .await
        .with_context(|| format!("无法创建存储目录: {:?}", config.storage_root()))?;

    let cache_service = Arc::new(CacheService::new(config.clone())?);

    let app = api::router(AppState { cache_service });

    let addr = config
        .bind_addr()
        .parse::<SocketAddr>()
        .with_context(|| format!("无效的监听地址: {}", config.bind_addr()))?;
    tracing::info!("🚀 Server listening on {}", addr);
    tracing::info!("📁 Storage root: {:?}", config.storage_root());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
