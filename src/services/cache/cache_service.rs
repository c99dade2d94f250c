// 缓存服务 - 协调所有缓存组件，提供“按 URL 获取图片”的统一入口
//
// 流程：校验输入 -> 推导缓存键 -> 检查缓存
//   - 命中：转码后返回
//   - 未命中：按顺序下载候选 URL -> 写入缓存 -> 转码后返回
//   - 失败：返回占位图
//
// 同一缓存键的并发首次请求可能重复下载，最后一次写入生效。

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::services::cache::{
    AssetType, CacheConfig, CacheError, CachePath, CacheStore, ConversionError, FileSystemError,
    HttpImageSource, ImageDownloader, ImageSource, JpegConverter, PlaceholderGenerator,
};

/// 缺少 url 参数时的占位文字
pub const MSG_NOT_FOUND: &str = "Image not Found / Invalid URL";

/// URL 无法解析为缓存键时的占位文字
pub const MSG_INVALID_FORMAT: &str = "Invalid URL Format";

/// 一次检索请求
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// 来源 URL
    pub url: Option<String>,
    /// 备用 URL（缺省时使用 `url`）
    pub fallback_url: Option<String>,
    /// JPEG 质量（1-100）
    pub quality: u8,
    /// 资源类型
    pub asset_type: AssetType,
}

impl RetrievalRequest {
    pub fn new(url: impl Into<String>, asset_type: AssetType, quality: u8) -> Self {
        Self {
            url: Some(url.into()),
            fallback_url: None,
            quality,
            asset_type,
        }
    }

    pub fn with_fallback(mut self, fallback_url: impl Into<String>) -> Self {
        self.fallback_url = Some(fallback_url.into());
        self
    }
}

/// 检索结果
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// 转码后的图片
    Image { bytes: Vec<u8>, filename: String },
    /// 占位图
    Placeholder { bytes: Vec<u8>, message: String },
}

impl RetrievalOutcome {
    pub fn bytes(&self) -> &[u8] {
        match self {
            RetrievalOutcome::Image { bytes, .. } => bytes,
            RetrievalOutcome::Placeholder { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RetrievalOutcome::Image { bytes, .. } => bytes,
            RetrievalOutcome::Placeholder { bytes, .. } => bytes,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RetrievalOutcome::Placeholder { .. })
    }
}

/// 缓存服务
#[derive(Clone)]
pub struct CacheService {
    /// 网关配置
    config: Arc<CacheConfig>,

    /// 缓存文件存储
    store: CacheStore,

    /// 图片下载器
    downloader: ImageDownloader,
}

impl CacheService {
    /// 创建新的缓存服务（使用 HTTP 图片来源）
    ///
    /// # 参数
    /// - `config`: 网关配置
    ///
    /// # 返回
    /// - `Result<Self, CacheError>`: 缓存服务实例或错误
    pub fn new(config: Arc<CacheConfig>) -> Result<Self, CacheError> {
        let source = Arc::new(HttpImageSource::new(config.fetch_timeout())?);
        Ok(Self::with_source(config, source))
    }

    /// 使用指定图片来源创建缓存服务
    pub fn with_source(config: Arc<CacheConfig>, source: Arc<dyn ImageSource>) -> Self {
        let store = CacheStore::new(config.storage_root.clone());
        let downloader = ImageDownloader::new(source, store.clone());

        Self {
            config,
            store,
            downloader,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// 按 URL 获取图片
    ///
    /// 这是缓存服务的主入口。检索路径上的失败（缺少 URL、URL 格式错误、
    /// 所有来源失败、图片无法解码）都会返回占位图；只有意外错误
    /// （磁盘写入失败等）才返回 `Err`。
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<RetrievalOutcome, CacheError> {
        let url = match request.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => {
                debug!("缺少 url 参数，返回占位图");
                return self.placeholder(MSG_NOT_FOUND).await;
            }
        };

        info!("请求图片: url={}, type={}", url, request.asset_type.as_str());

        // 1. 推导缓存键
        let key = match CachePath::derive(url, request.asset_type) {
            Ok(key) => key,
            Err(e) if e.is_invalid_key() => {
                warn!("无法解析缓存键: {}", e);
                return self.placeholder(MSG_INVALID_FORMAT).await;
            }
            Err(e) => return Err(e),
        };

        let dir = key.dir(self.store.root());
        self.store.ensure_dir(&dir).await?;
        let file_path = dir.join(&key.filename);

        // 2. 检查缓存
        if let Some(outcome) = self
            .serve_cached(&file_path, &key.filename, request.quality)
            .await?
        {
            return Ok(outcome);
        }

        // 3. 未命中，按顺序下载
        let fallback_url = request
            .fallback_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(url);
        let candidates = ImageDownloader::candidates(&key.download_url, Some(fallback_url));

        match self.downloader.download_first(&candidates, &file_path).await {
            Ok(fetched) => {
                self.transcode_or_placeholder(fetched.bytes, &key.filename, request.quality)
                    .await
            }
            Err(CacheError::AllSourcesFailed { last_url }) => {
                warn!("所有下载源均失败，最后尝试: {}", last_url);
                self.placeholder(&format!("Failed to download file from {}", fallback_url))
                    .await
            }
            Err(e) => {
                error!("下载流程异常: {}", e);
                Err(e)
            }
        }
    }

    /// 从缓存读取并转码，未命中返回 `None`
    async fn serve_cached(
        &self,
        file_path: &Path,
        filename: &str,
        quality: u8,
    ) -> Result<Option<RetrievalOutcome>, CacheError> {
        if !self.store.exists(file_path).await {
            debug!("缓存未命中: {:?}", file_path);
            return Ok(None);
        }

        match self.store.read(file_path).await {
            Ok(bytes) => {
                debug!("缓存命中: {:?}", file_path);
                self.transcode_or_placeholder(bytes, filename, quality)
                    .await
                    .map(Some)
            }
            Err(FileSystemError::NotFound(_)) => {
                warn!("缓存文件在读取前被删除，按未命中处理: {:?}", file_path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 转码；数据无法解码时返回占位图
    async fn transcode_or_placeholder(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        quality: u8,
    ) -> Result<RetrievalOutcome, CacheError> {
        match JpegConverter::transcode_async(bytes, quality).await {
            Ok(bytes) => Ok(RetrievalOutcome::Image {
                bytes,
                filename: filename.to_string(),
            }),
            Err(ConversionError::DecodeFailed(reason)) => {
                warn!("图片解码失败: {} - {}", filename, reason);
                self.placeholder(&format!("Failed to process image {}", filename))
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn placeholder(&self, message: &str) -> Result<RetrievalOutcome, CacheError> {
        let bytes = PlaceholderGenerator::render_async(message.to_string()).await?;
        Ok(RetrievalOutcome::Placeholder {
            bytes,
            message: message.to_string(),
        })
    }
}
