// 占位图生成器
//
// 检索失败时返回一张固定尺寸的灰底黑字图片，文字按固定宽度换行，
// 整体垂直居中，每行水平居中。

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, Rgb, RgbImage};
use tokio::task;

use crate::services::cache::error::ConversionError;
use crate::services::cache::jpeg_converter::JpegConverter;

/// 占位图生成器
pub struct PlaceholderGenerator;

impl PlaceholderGenerator {
    pub const WIDTH: u32 = 400;
    pub const HEIGHT: u32 = 800;

    /// 每行最多字符数
    pub const WRAP_WIDTH: usize = 20;

    /// 8x8 点阵字体放大倍数
    const GLYPH_SCALE: u32 = 2;
    const GLYPH_SIZE: u32 = 8 * Self::GLYPH_SCALE;
    const LINE_SPACING: u32 = 4;

    const BACKGROUND: Rgb<u8> = Rgb([192, 192, 192]);
    const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

    /// 与 PIL 默认保存质量一致
    const JPEG_QUALITY: u8 = 75;

    /// 异步生成占位图（JPEG）
    pub async fn render_async(text: String) -> Result<Vec<u8>, ConversionError> {
        task::spawn_blocking(move || Self::render(&text))
            .await
            .map_err(|e| ConversionError::ConversionFailed(format!("任务执行失败: {}", e)))?
    }

    /// 生成占位图（JPEG）
    ///
    /// 相同文本总是生成相同的字节。
    pub fn render(text: &str) -> Result<Vec<u8>, ConversionError> {
        let canvas = Self::draw(text);
        JpegConverter::encode_jpeg(&DynamicImage::ImageRgb8(canvas), Self::JPEG_QUALITY)
    }

    /// 绘制未编码的画布
    fn draw(text: &str) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(Self::WIDTH, Self::HEIGHT, Self::BACKGROUND);

        let lines = Self::wrap_lines(text);
        if lines.is_empty() {
            return canvas;
        }

        let line_height = Self::GLYPH_SIZE + Self::LINE_SPACING;
        let block_height = line_height * lines.len() as u32 - Self::LINE_SPACING;
        let mut y = Self::HEIGHT.saturating_sub(block_height) / 2;

        for line in &lines {
            let line_width = line.chars().count() as u32 * Self::GLYPH_SIZE;
            let x = Self::WIDTH.saturating_sub(line_width) / 2;
            Self::draw_line(&mut canvas, line, x, y);
            y += line_height;
        }

        canvas
    }

    /// 按固定宽度换行，过长的单词会被截断到下一行
    pub fn wrap_lines(text: &str) -> Vec<String> {
        textwrap::wrap(text, Self::WRAP_WIDTH)
            .into_iter()
            .map(|line| line.into_owned())
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    fn draw_line(canvas: &mut RgbImage, line: &str, x: u32, y: u32) {
        for (i, ch) in line.chars().enumerate() {
            // 无字形的字符留空
            if let Some(glyph) = BASIC_FONTS.get(ch) {
                Self::draw_glyph(canvas, &glyph, x + i as u32 * Self::GLYPH_SIZE, y);
            }
        }
    }

    fn draw_glyph(canvas: &mut RgbImage, glyph: &[u8; 8], x: u32, y: u32) {
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = x + col * Self::GLYPH_SCALE;
                let py = y + row as u32 * Self::GLYPH_SCALE;
                for dy in 0..Self::GLYPH_SCALE {
                    for dx in 0..Self::GLYPH_SCALE {
                        if px + dx < Self::WIDTH && py + dy < Self::HEIGHT {
                            canvas.put_pixel(px + dx, py + dy, Self::TEXT_COLOR);
                        }
                    }
                }
            }
        }
    }
}
