// 图片下载 API
//
// GET /download?url=&fallback_url=&quality=&type=

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use crate::services::cache::{clamp_quality, AssetType, RetrievalOutcome, RetrievalRequest};

use super::error::{ApiError, ApiResult};
use super::AppState;

#[derive(Debug, Default)]
pub struct DownloadParams {
    pub url: Option<String>,
    pub fallback_url: Option<String>,
    /// 保留原始字符串，非整数时返回 500
    pub quality: Option<String>,
    /// 查询参数 `type`
    pub asset_type: Option<String>,
}

impl DownloadParams {
    /// 从查询参数对构造，同名参数只取第一个值
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "url" => &mut params.url,
                "fallback_url" => &mut params.fallback_url,
                "quality" => &mut params.quality,
                "type" => &mut params.asset_type,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// 转换为检索请求
    pub fn into_request(self, default_quality: u8) -> ApiResult<RetrievalRequest> {
        let quality = match self.quality.as_deref() {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(clamp_quality)
                .map_err(|_| ApiError::Internal(format!("invalid quality value: '{}'", raw)))?,
            None => default_quality,
        };

        let asset_type = self
            .asset_type
            .as_deref()
            .map(AssetType::parse)
            .unwrap_or_default();

        Ok(RetrievalRequest {
            url: self.url,
            fallback_url: self.fallback_url,
            quality,
            asset_type,
        })
    }
}

/// 获取（缓存的）图片
///
/// # 端点
/// GET /download
///
/// # 响应
/// - 200 `image/jpeg`：转码后的图片或占位图
/// - 500 `text/plain`：意外错误
pub async fn download_image(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(pairs) = query.map_err(|e| ApiError::Internal(e.body_text()))?;
    let request = DownloadParams::from_pairs(pairs)
        .into_request(state.cache_service.config().default_quality)?;

    let outcome = state.cache_service.retrieve(&request).await?;

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg");

    let builder = match &outcome {
        RetrievalOutcome::Image { filename, .. } => {
            builder.header(header::CONTENT_DISPOSITION, content_disposition(filename))
        }
        RetrievalOutcome::Placeholder { message, .. } => {
            tracing::debug!("返回占位图: {}", message);
            builder
        }
    };

    builder
        .body(Body::from(outcome.into_bytes()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// 构造 inline 的 Content-Disposition，非 ASCII 文件名使用 RFC 5987 编码
pub fn content_disposition(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');

    if plain {
        format!("inline; filename=\"{}\"", filename)
    } else {
        format!(
            "inline; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}
