// 缓存配置数据结构
//
// 进程启动时从环境变量构造一次，之后以 Arc 注入到服务与路由中，
// 测试可以直接构造并替换存储根目录。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::cache::jpeg_converter::{clamp_quality, DEFAULT_JPEG_QUALITY};

/// 网关缓存配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// 存储根目录（封面与章节图片都保存在其下）
    pub storage_root: PathBuf,

    /// 单次外部下载的超时时间（秒）
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// 未指定 quality 参数时使用的 JPEG 质量
    #[serde(default = "default_quality")]
    pub default_quality: u8,

    /// 上传接口的请求体上限（MB）
    #[serde(default = "default_upload_limit_mb")]
    pub upload_limit_mb: usize,

    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_upload_limit_mb() -> usize {
    50
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(Self::DEFAULT_STORAGE_ROOT),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            default_quality: default_quality(),
            upload_limit_mb: default_upload_limit_mb(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl CacheConfig {
    /// 默认存储根目录
    pub const DEFAULT_STORAGE_ROOT: &'static str = "/mnt/local-usb/MangaCollection";

    /// 存储根目录环境变量
    pub const ENV_STORAGE_ROOT: &'static str = "MANGA_COLLECTION_DIRECTORY";
    pub const ENV_FETCH_TIMEOUT: &'static str = "FETCH_TIMEOUT_SECS";
    pub const ENV_DEFAULT_QUALITY: &'static str = "DEFAULT_QUALITY";
    pub const ENV_UPLOAD_LIMIT: &'static str = "UPLOAD_LIMIT_MB";
    pub const ENV_HOST: &'static str = "HOST";
    pub const ENV_PORT: &'static str = "PORT";

    /// 从进程环境变量读取配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过查找函数读取配置
    ///
    /// 数值无法解析时回退到默认值并记录警告。
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_root = lookup(Self::ENV_STORAGE_ROOT)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_root);

        let fetch_timeout_secs = parse_or(
            &lookup,
            Self::ENV_FETCH_TIMEOUT,
            defaults.fetch_timeout_secs,
        );

        let default_quality = lookup(Self::ENV_DEFAULT_QUALITY)
            .and_then(|v| match v.trim().parse::<i64>() {
                Ok(q) => Some(clamp_quality(q)),
                Err(e) => {
                    tracing::warn!("{} 解析失败，使用默认值: {}", Self::ENV_DEFAULT_QUALITY, e);
                    None
                }
            })
            .unwrap_or(defaults.default_quality);

        let upload_limit_mb =
            parse_or(&lookup, Self::ENV_UPLOAD_LIMIT, defaults.upload_limit_mb);

        let host = lookup(Self::ENV_HOST)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.host);

        let port = parse_or(&lookup, Self::ENV_PORT, defaults.port);

        Self {
            storage_root,
            fetch_timeout_secs,
            default_quality,
            upload_limit_mb,
            host,
            port,
        }
    }

    /// 使用指定存储根目录、其余取默认值
    pub fn with_storage_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }

    /// `host:port` 形式的监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|e| {
            tracing::warn!("{} 解析失败，使用默认值: {}", key, e);
            default
        }),
        None => default,
    }
}
