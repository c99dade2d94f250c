// 图片下载器 - 按顺序尝试候选 URL
//
// 本模块提供缓存未命中时的下载功能，包括：
// - 候选 URL 列表（主 URL 在前，备用 URL 去重后在后）
// - 每个候选只尝试一次，首个 HTTP 200 即停止
// - 下载成功后写入缓存存储
// - 超时控制

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::cache::error::{CacheError, DownloadError};
use crate::services::cache::store::CacheStore;

/// 远程图片来源
///
/// 只有 HTTP 200 视为成功，其余状态码和传输错误都返回 `DownloadError`。
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// 基于 reqwest 的 HTTP 图片来源
#[derive(Clone)]
pub struct HttpImageSource {
    /// HTTP 客户端（自带连接池）
    client: Client,
}

impl HttpImageSource {
    const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// 创建 HTTP 图片来源
    ///
    /// # 参数
    /// - `timeout`: 单次请求超时时间
    pub fn new(timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90)) // 空闲连接超时 90 秒
            .build()
            .map_err(|e| CacheError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::HttpError(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// 下载成功的结果
#[derive(Debug)]
pub struct FetchSuccess {
    /// 实际成功的 URL
    pub url: String,
    /// 下载到的原始数据（已写入缓存）
    pub bytes: Vec<u8>,
}

/// 图片下载器
///
/// 依次尝试候选 URL，把第一个成功的响应体写入缓存。
#[derive(Clone)]
pub struct ImageDownloader {
    source: Arc<dyn ImageSource>,
    store: CacheStore,
}

impl ImageDownloader {
    pub fn new(source: Arc<dyn ImageSource>, store: CacheStore) -> Self {
        Self { source, store }
    }

    /// 生成候选 URL 列表
    ///
    /// 主 URL 在前；备用 URL 仅在与主 URL 不同时追加。
    ///
    /// # 示例
    /// ```
    /// use manga_cache_backend::services::cache::ImageDownloader;
    ///
    /// let same = ImageDownloader::candidates("https://a/x.jpg", Some("https://a/x.jpg"));
    /// assert_eq!(same, vec!["https://a/x.jpg".to_string()]);
    ///
    /// let both = ImageDownloader::candidates("https://a/x.jpg", Some("https://b/x.jpg"));
    /// assert_eq!(both.len(), 2);
    /// ```
    pub fn candidates(primary: &str, fallback: Option<&str>) -> Vec<String> {
        let mut urls = vec![primary.to_string()];
        if let Some(fallback) = fallback.filter(|f| !f.is_empty() && *f != primary) {
            urls.push(fallback.to_string());
        }
        urls
    }

    /// 依次下载候选 URL，首个成功的写入 `target`
    ///
    /// # 参数
    /// - `candidates`: 候选 URL（按优先级排列）
    /// - `target`: 缓存文件路径
    ///
    /// # 返回
    /// - `Ok(FetchSuccess)`: 成功的 URL 与数据
    /// - `Err(CacheError::AllSourcesFailed)`: 所有候选都失败
    /// - `Err(CacheError::FileSystem)`: 写入缓存失败（不再尝试后续候选）
    ///
    /// # 重试
    /// - 不重试，每个候选只请求一次
    pub async fn download_first(
        &self,
        candidates: &[String],
        target: &Path,
    ) -> Result<FetchSuccess, CacheError> {
        let mut last_url = None;

        for (attempt, url) in candidates.iter().enumerate() {
            debug!(
                "开始下载图片 ({}/{}): {} -> {:?}",
                attempt + 1,
                candidates.len(),
                url,
                target
            );

            match self.source.fetch(url).await {
                Ok(bytes) => {
                    self.store.write(target, &bytes).await?;
                    info!("图片下载成功: {} -> {:?} ({} 字节)", url, target, bytes.len());
                    return Ok(FetchSuccess {
                        url: url.clone(),
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(
                        "图片下载失败 ({}/{}): {} - 错误: {}",
                        attempt + 1,
                        candidates.len(),
                        url,
                        e
                    );
                    last_url = Some(url.clone());
                }
            }
        }

        Err(CacheError::AllSourcesFailed {
            last_url: last_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 按 URL 返回预设结果的来源，记录调用顺序
    #[derive(Default)]
    struct ScriptedSource {
        responses: HashMap<String, Result<Vec<u8>, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn with(mut self, url: &str, response: Result<&[u8], u16>) -> Self {
            self.responses
                .insert(url.to_string(), response.map(|b| b.to_vec()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageSource for ScriptedSource {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(bytes)) => Ok(bytes.clone()),
                Some(Err(status)) => Err(DownloadError::HttpError(*status)),
                None => Err(DownloadError::NetworkError("connection refused".to_string())),
            }
        }
    }

    fn create_downloader(source: Arc<ScriptedSource>) -> (ImageDownloader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let downloader = ImageDownloader::new(source, CacheStore::new(temp_dir.path()));
        (downloader, temp_dir)
    }

    #[test]
    fn test_candidates_dedup() {
        assert_eq!(
            ImageDownloader::candidates("u1", None),
            vec!["u1".to_string()]
        );
        assert_eq!(
            ImageDownloader::candidates("u1", Some("u1")),
            vec!["u1".to_string()]
        );
        assert_eq!(
            ImageDownloader::candidates("u1", Some("")),
            vec!["u1".to_string()]
        );
        assert_eq!(
            ImageDownloader::candidates("u1", Some("u2")),
            vec!["u1".to_string(), "u2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let source = Arc::new(
            ScriptedSource::default()
                .with("http://a/1.jpg", Ok(b"primary"))
                .with("http://b/1.jpg", Ok(b"fallback")),
        );
        let (downloader, temp_dir) = create_downloader(source.clone());
        let target = temp_dir.path().join("manga_a/1/1.jpg");

        let result = downloader
            .download_first(
                &ImageDownloader::candidates("http://a/1.jpg", Some("http://b/1.jpg")),
                &target,
            )
            .await
            .unwrap();

        assert_eq!(result.url, "http://a/1.jpg");
        assert_eq!(std::fs::read(&target).unwrap(), b"primary");
        assert_eq!(source.calls(), vec!["http://a/1.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let source = Arc::new(
            ScriptedSource::default()
                .with("http://a/1.jpg", Err(404))
                .with("http://b/1.jpg", Ok(b"fallback")),
        );
        let (downloader, temp_dir) = create_downloader(source.clone());
        let target = temp_dir.path().join("1.jpg");

        let result = downloader
            .download_first(
                &ImageDownloader::candidates("http://a/1.jpg", Some("http://b/1.jpg")),
                &target,
            )
            .await
            .unwrap();

        assert_eq!(result.url, "http://b/1.jpg");
        assert_eq!(result.bytes, b"fallback");
        assert_eq!(std::fs::read(&target).unwrap(), b"fallback");
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let source = Arc::new(ScriptedSource::default().with("http://a/1.jpg", Err(500)));
        let (downloader, temp_dir) = create_downloader(source.clone());
        let target = temp_dir.path().join("1.jpg");

        let result = downloader
            .download_first(
                &ImageDownloader::candidates("http://a/1.jpg", Some("http://b/1.jpg")),
                &target,
            )
            .await;

        match result {
            Err(CacheError::AllSourcesFailed { last_url }) => {
                assert_eq!(last_url, "http://b/1.jpg")
            }
            other => panic!("期望 AllSourcesFailed，得到: {:?}", other.map(|s| s.url)),
        }
        assert!(!target.exists());
        // 每个候选只尝试一次
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_single_candidate_attempted_once() {
        let source = Arc::new(ScriptedSource::default());
        let (downloader, temp_dir) = create_downloader(source.clone());

        let result = downloader
            .download_first(
                &ImageDownloader::candidates("http://a/1.jpg", Some("http://a/1.jpg")),
                &temp_dir.path().join("1.jpg"),
            )
            .await;

        assert!(matches!(result, Err(CacheError::AllSourcesFailed { .. })));
        assert_eq!(source.calls(), vec!["http://a/1.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_http_source_connection_refused() {
        let source = HttpImageSource::new(Duration::from_secs(5)).unwrap();
        // 端口 1 通常没有监听
        let result = source.fetch("http://127.0.0.1:1/image.jpg").await;

        match result {
            Err(DownloadError::NetworkError(_)) | Err(DownloadError::Timeout) => {}
            other => panic!("期望网络错误或超时，得到: {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn test_http_source_invalid_url() {
        let source = HttpImageSource::new(Duration::from_secs(5)).unwrap();
        let result = source.fetch("not a url").await;
        assert!(result.is_err());
    }
}
