// 缓存模块错误类型定义
//
// 定义了图片检索流程中可能出现的各种错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 缓存操作的统一错误类型
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("无效的 URL 格式: {0}")]
    InvalidUrlFormat(String),

    #[error("非法的文件名: {0}")]
    InvalidFilename(String),

    #[error("所有下载源均失败，最后尝试: {last_url}")]
    AllSourcesFailed { last_url: String },

    #[error("转换错误: {0}")]
    Conversion(#[from] ConversionError),

    #[error("文件系统错误: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("配置错误: {0}")]
    Config(String),
}

impl CacheError {
    /// 是否属于“无法解析为缓存键”的错误（应返回占位图）
    pub fn is_invalid_key(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidUrlFormat(_) | CacheError::InvalidFilename(_)
        )
    }
}

/// 下载相关错误
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("下载超时")]
    Timeout,

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP 错误: 状态码 {0}")]
    HttpError(u16),
}

/// 图片转换相关错误
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("图片解码失败: {0}")]
    DecodeFailed(String),

    #[error("图片编码失败: {0}")]
    EncodeFailed(String),

    #[error("转换失败: {0}")]
    ConversionFailed(String),
}

/// 文件系统相关错误
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("路径不存在: {0}")]
    NotFound(PathBuf),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("创建目录失败: {0}")]
    CreateDirFailed(String),

    #[error("写入文件失败: {0}")]
    WriteFileFailed(String),
}

// 实现从 reqwest::Error 到 DownloadError 的转换
impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DownloadError::Timeout
        } else if err.is_builder() {
            DownloadError::InvalidUrl(err.to_string())
        } else if let Some(status) = err.status() {
            DownloadError::HttpError(status.as_u16())
        } else {
            DownloadError::NetworkError(err.to_string())
        }
    }
}
