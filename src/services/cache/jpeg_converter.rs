// JPEG 转换器 - 图片格式转换
//
// 将任意可解码的图片（jpg、png、gif、webp）重新编码为指定质量的 JPEG，
// 缓存命中与新下载的图片都经过这里。

use crate::services::cache::error::ConversionError;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use tokio::task;

/// 默认 JPEG 质量
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const MIN_JPEG_QUALITY: u8 = 1;
pub const MAX_JPEG_QUALITY: u8 = 100;

/// 将任意整数质量限制到 1..=100
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY as i64, MAX_JPEG_QUALITY as i64) as u8
}

/// JPEG 转换器
pub struct JpegConverter;

impl JpegConverter {
    /// 异步转码为 JPEG
    ///
    /// 使用 `tokio::task::spawn_blocking` 将 CPU 密集型操作移到阻塞线程池，
    /// 避免阻塞异步运行时。
    ///
    /// # 参数
    /// - `image_data`: 原始图片数据
    /// - `quality`: JPEG 质量（1-100）
    ///
    /// # 返回
    /// - `Ok(Vec<u8>)`: JPEG 数据
    /// - `Err(ConversionError)`: 解码或编码失败
    pub async fn transcode_async(
        image_data: Vec<u8>,
        quality: u8,
    ) -> Result<Vec<u8>, ConversionError> {
        task::spawn_blocking(move || Self::transcode(&image_data, quality))
            .await
            .map_err(|e| ConversionError::ConversionFailed(format!("任务执行失败: {}", e)))?
    }

    /// 转码为 JPEG
    ///
    /// # 示例
    /// ```no_run
    /// use manga_cache_backend::services::cache::JpegConverter;
    ///
    /// let png_data = std::fs::read("page.png").unwrap();
    /// let jpeg_data = JpegConverter::transcode(&png_data, 80).unwrap();
    /// std::fs::write("page.jpg", jpeg_data).unwrap();
    /// ```
    pub fn transcode(image_data: &[u8], quality: u8) -> Result<Vec<u8>, ConversionError> {
        let img = Self::decode(image_data)?;
        Self::encode_jpeg(&img, quality)
    }

    /// 解码图片（自动识别格式）
    pub fn decode(image_data: &[u8]) -> Result<DynamicImage, ConversionError> {
        let format = image::guess_format(image_data).map_err(|e| {
            ConversionError::DecodeFailed(format!("无法识别图片格式: {}", e))
        })?;

        image::load_from_memory_with_format(image_data, format)
            .map_err(|e| ConversionError::DecodeFailed(format!("图片解码失败: {}", e)))
    }

    /// 编码为 JPEG（JPEG 不支持透明通道，统一转换为 RGB8）
    pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ConversionError> {
        let rgb = img.to_rgb8();
        let quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);

        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| ConversionError::EncodeFailed(format!("JPEG 编码失败: {}", e)))?;

        Ok(buffer)
    }
}
