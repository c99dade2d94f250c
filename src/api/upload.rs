// 文件上传 API
//
// POST /upload（multipart），原样写入共享存储目录，不经过转码。

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::services::cache::CachePath;

use super::error::{ApiError, ApiResult};
use super::AppState;

pub const MSG_MISSING_FIELDS: &str = "Manga_id, chapter_id, and filename are required";

/// 上传表单
#[derive(Debug, Default)]
pub struct UploadForm {
    pub manga_id: Option<String>,
    pub chapter_id: Option<String>,
    pub filename: Option<String>,
    pub file: Option<Vec<u8>>,
}

impl UploadForm {
    /// 读取 multipart 所有字段（字段顺序任意）
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "manga_id" | "chapter_id" | "filename" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::Internal(e.to_string()))?;
                    match name.as_str() {
                        "manga_id" => form.manga_id = Some(value),
                        "chapter_id" => form.chapter_id = Some(value),
                        _ => form.filename = Some(value),
                    }
                }
                "file" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Internal(e.to_string()))?;
                    form.file = Some(bytes.to_vec());
                }
                other => tracing::debug!("忽略未知上传字段: {}", other),
            }
        }

        Ok(form)
    }

    /// 三个必填字段，空字符串视为缺失
    fn required_fields(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(&self.manga_id)?,
            non_empty(&self.chapter_id)?,
            non_empty(&self.filename)?,
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// 上传文件
///
/// # 端点
/// POST /upload
///
/// # 表单字段
/// - `manga_id`: 为 `cover` 时保存到封面目录
/// - `chapter_id`
/// - `filename`
/// - `file`: 文件内容
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = UploadForm::read(multipart).await?;

    let (manga_id, chapter_id, filename) = match form.required_fields() {
        Some(fields) => fields,
        None => {
            tracing::warn!(
                "上传缺少必填字段: manga_id={:?}, chapter_id={:?}, filename={:?}",
                form.manga_id,
                form.chapter_id,
                form.filename
            );
            return Err(ApiError::MissingParameter(MSG_MISSING_FIELDS.to_string()));
        }
    };

    let store = state.cache_service.store();
    let dir = CachePath::upload_dir(store.root(), manga_id, chapter_id)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    CachePath::validate_component(filename).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let file = form
        .file
        .as_deref()
        .ok_or_else(|| ApiError::Internal("missing file part 'file'".to_string()))?;

    let path = dir.join(filename);
    store.write(&path, file).await.map_err(|e| {
        tracing::error!("保存上传文件失败: {:?} - {}", path, e);
        ApiError::Internal(e.to_string())
    })?;

    tracing::info!("上传文件已保存: {:?} ({} 字节)", path, file.len());

    Ok((StatusCode::OK, "File saved successfully"))
}
