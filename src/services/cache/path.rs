// 缓存路径管理
//
// 从来源 URL 推导缓存位置：
// - 章节图片：`<root>/<manga_id>/<chapter_id>/<filename>`
// - 封面图片：`<root>/cover-images/<filename>`，并去掉尺寸后缀

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::services::cache::error::CacheError;

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// 章节页面
    #[default]
    Page,
    /// 封面
    Cover,
}

impl AssetType {
    pub fn as_str(&self) -> &str {
        match self {
            AssetType::Page => "page",
            AssetType::Cover => "cover",
        }
    }

    /// 从查询参数解析，只有 `cover` 会被识别为封面
    pub fn parse(s: &str) -> Self {
        if s == "cover" {
            AssetType::Cover
        } else {
            AssetType::Page
        }
    }
}

/// 缓存键
///
/// 相对存储根目录的子目录 + 文件名，以及实际用于下载的（规范化后的）URL。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// 子目录（`cover-images` 或 `<manga_id>/<chapter_id>`）
    pub subdir: PathBuf,
    /// 文件名（URL 最后一段）
    pub filename: String,
    /// 下载用 URL（封面已去掉尺寸后缀）
    pub download_url: String,
}

impl CacheKey {
    /// 缓存目录绝对路径
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.subdir)
    }

    /// 缓存文件绝对路径
    pub fn file_path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(&self.filename)
    }
}

/// 缓存路径生成器
pub struct CachePath;

impl CachePath {
    /// 封面目录
    pub const COVER_DIR: &'static str = "cover-images";

    /// 上传接口中表示封面的 manga_id
    pub const COVER_MANGA_ID: &'static str = "cover";

    fn page_regex() -> &'static Regex {
        static PAGE_URL_REGEX: OnceLock<Regex> = OnceLock::new();
        PAGE_URL_REGEX.get_or_init(|| {
            // 与 `re.match` 一致：从开头匹配，贪婪 `.*` 取最后一组 manga_xxx/yyy/
            Regex::new(r"(?i)^.*/(manga_[a-z0-9]+)/([a-z0-9]+)/")
                .expect("章节 URL 正则表达式编译失败")
        })
    }

    fn cover_suffix_regex() -> &'static Regex {
        static COVER_SUFFIX_REGEX: OnceLock<Regex> = OnceLock::new();
        COVER_SUFFIX_REGEX.get_or_init(|| {
            Regex::new(r"(-\d{1,4}x\d{1,4})\.jpg$").expect("封面尺寸正则表达式编译失败")
        })
    }

    /// 从来源 URL 推导缓存键
    ///
    /// # 参数
    /// - `url`: 来源 URL
    /// - `asset_type`: 资源类型
    ///
    /// # 返回
    /// - `Ok(CacheKey)`: 缓存键
    /// - `Err(CacheError::InvalidUrlFormat)`: 章节 URL 中找不到 `manga_xxx/yyy/`
    /// - `Err(CacheError::InvalidFilename)`: 文件名为空或包含路径成分
    ///
    /// # 示例
    /// ```
    /// use manga_cache_backend::services::cache::{AssetType, CachePath};
    /// use std::path::Path;
    ///
    /// let key = CachePath::derive(
    ///     "https://cdn.example.com/data/manga_abc123/ch42/001.jpg",
    ///     AssetType::Page,
    /// ).unwrap();
    /// assert_eq!(
    ///     key.file_path(Path::new("/srv")),
    ///     Path::new("/srv/manga_abc123/ch42/001.jpg")
    /// );
    ///
    /// let key = CachePath::derive(
    ///     "https://cdn.example.com/covers/one-piece-512x768.jpg",
    ///     AssetType::Cover,
    /// ).unwrap();
    /// assert_eq!(key.filename, "one-piece.jpg");
    /// ```
    pub fn derive(url: &str, asset_type: AssetType) -> Result<CacheKey, CacheError> {
        let (subdir, download_url) = match asset_type {
            AssetType::Cover => (
                PathBuf::from(Self::COVER_DIR),
                Self::strip_cover_suffix(url),
            ),
            AssetType::Page => {
                let captures = Self::page_regex()
                    .captures(url)
                    .ok_or_else(|| CacheError::InvalidUrlFormat(url.to_string()))?;
                let subdir = PathBuf::from(&captures[1]).join(&captures[2]);
                (subdir, url.to_string())
            }
        };

        let filename = Self::filename_from_url(&download_url).to_string();
        Self::validate_component(&filename)
            .map_err(|_| CacheError::InvalidFilename(filename.clone()))?;

        Ok(CacheKey {
            subdir,
            filename,
            download_url,
        })
    }

    /// 去掉封面 URL 末尾的 `-WxH` 尺寸后缀（仅 `.jpg`）
    pub fn strip_cover_suffix(url: &str) -> String {
        match Self::cover_suffix_regex().captures(url).and_then(|c| c.get(1)) {
            Some(suffix) => format!("{}{}", &url[..suffix.start()], &url[suffix.end()..]),
            None => url.to_string(),
        }
    }

    /// URL 最后一个 `/` 之后的部分
    pub fn filename_from_url(url: &str) -> &str {
        url.rsplit('/').next().unwrap_or(url)
    }

    /// 校验单个路径成分，拒绝可能逃逸出存储目录的值
    pub fn validate_component(component: &str) -> Result<(), CacheError> {
        let unsafe_component = component.is_empty()
            || component == "."
            || component == ".."
            || component.contains(&['/', '\\', '\0'][..]);

        if unsafe_component {
            return Err(CacheError::InvalidFilename(component.to_string()));
        }
        Ok(())
    }

    /// 上传文件的保存目录
    ///
    /// `manga_id == "cover"` 时保存到封面目录，否则为 `<manga_id>/<chapter_id>`。
    pub fn upload_dir(
        root: &Path,
        manga_id: &str,
        chapter_id: &str,
    ) -> Result<PathBuf, CacheError> {
        if manga_id == Self::COVER_MANGA_ID {
            return Ok(root.join(Self::COVER_DIR));
        }
        Self::validate_component(manga_id)?;
        Self::validate_component(chapter_id)?;
        Ok(root.join(manga_id).join(chapter_id))
    }
}
