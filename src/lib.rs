// 漫画图片缓存网关库
//
// 本库提供漫画页面/封面图片的缓存网关功能，包括：
// - API 路由（/download、/upload、健康检查）
// - 缓存键推导、缓存存储
// - 主/备用 URL 下载与 JPEG 转码
// - 失败时的占位图

pub mod api;
pub mod services;
