// 缓存文件存储
//
// 以目录为键的只追加文件存储：检查是否存在、读取、写入。
// 不做任何淘汰，写入后的文件永久保留。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::services::cache::error::FileSystemError;

/// 缓存文件存储
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// 存储根目录
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 确保目录存在（包含父目录，幂等）
    pub async fn ensure_dir(&self, dir: &Path) -> Result<(), FileSystemError> {
        fs::create_dir_all(dir).await.map_err(|e| {
            FileSystemError::CreateDirFailed(format!("{}: {}", dir.display(), e))
        })
    }

    /// 文件是否存在
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// 读取缓存文件
    ///
    /// 文件在检查与读取之间被删除时返回 `FileSystemError::NotFound`，
    /// 调用方应按未命中处理。
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FileSystemError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(FileSystemError::IoError(e)),
        }
    }

    /// 写入缓存文件
    ///
    /// 先写入同目录下的临时文件再重命名，读取方不会看到写了一半的内容。
    /// 并发写同一路径时最后一次重命名生效。
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<(), FileSystemError> {
        let parent = path
            .parent()
            .ok_or_else(|| FileSystemError::WriteFileFailed(format!("无父目录: {}", path.display())))?;
        self.ensure_dir(parent).await?;

        // 临时文件名长度固定，不受目标文件名长度影响
        let tmp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp_path, data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileSystemError::WriteFileFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FileSystemError::WriteFileFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        debug!("缓存文件已写入: {:?} ({} 字节)", path, data.len());
        Ok(())
    }
}
