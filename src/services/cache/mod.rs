// 缓存模块 - 漫画图片检索与缓存
//
// 本模块提供漫画页面/封面图片的缓存网关功能，包括：
// - 从 URL 推导缓存键
// - 缓存文件存储
// - 主/备用 URL 顺序下载
// - JPEG 转码
// - 占位图生成

pub mod cache_service;
pub mod config;
pub mod error;
pub mod image_downloader;
pub mod jpeg_converter;
pub mod path;
pub mod placeholder;
pub mod store;

pub use cache_service::{CacheService, RetrievalOutcome, RetrievalRequest};
pub use config::CacheConfig;
pub use error::{CacheError, ConversionError, DownloadError, FileSystemError};
pub use image_downloader::{FetchSuccess, HttpImageSource, ImageDownloader, ImageSource};
pub use jpeg_converter::{clamp_quality, JpegConverter, DEFAULT_JPEG_QUALITY};
pub use path::{AssetType, CacheKey, CachePath};
pub use placeholder::PlaceholderGenerator;
pub use store::CacheStore;
