// 集成测试公共工具
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat};
use manga_cache_backend::api::{self, AppState};
use manga_cache_backend::services::cache::{CacheConfig, CacheService, DownloadError, ImageSource};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

/// 预设响应的图片来源，记录所有请求
#[derive(Default)]
pub struct MockSource {
    responses: HashMap<String, Result<Vec<u8>, u16>>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn ok(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for MockSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(DownloadError::HttpError(*status)),
            None => Err(DownloadError::NetworkError("connection refused".to_string())),
        }
    }
}

/// 测试应用：路由 + 临时存储目录 + mock 来源
pub struct TestApp {
    pub router: Router,
    pub source: Arc<MockSource>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn new(source: MockSource) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(source);
        let config = Arc::new(CacheConfig::with_storage_root(temp_dir.path()));
        let cache_service = Arc::new(CacheService::with_source(config, source.clone()));
        let router = api::router(AppState { cache_service });

        Self {
            router,
            source,
            temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

/// 构造 /download 查询 URI
pub fn download_uri(params: &[(&str, &str)]) -> String {
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    format!("/download?{}", query.join("&"))
}

/// 生成测试用 PNG
pub fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb(rgb)));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

pub const BOUNDARY: &str = "----manga-cache-test-boundary";

/// 构造 multipart/form-data 请求体
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
