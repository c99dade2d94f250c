use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::services::cache::CacheError;

/// 统一的API错误类型（纯文本响应）
#[derive(Debug)]
pub enum ApiError {
    /// 缺少必填参数
    MissingParameter(String),
    /// 请求参数错误
    BadRequest(String),
    /// 内部服务器错误
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingParameter(msg) => write!(f, "{}", msg),
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Internal(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// 从缓存错误转换（检索路径上可恢复的错误已在服务内处理为占位图）
impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// 实现IntoResponse，将错误转换为纯文本HTTP响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingParameter(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;
