//! 图片验证模块
//!
//! 选择阶段按扩展名筛选 JPEG；读取和改写 EXIF 前再按文件头确认内容确实是 JPEG。

use std::path::Path;

use image::ImageFormat;

/// 图片验证器
pub struct ImageValidator;

impl ImageValidator {
    /// 检查扩展名是否为 `.jpg` / `.jpeg`（不区分大小写）
    pub fn has_jpeg_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false)
    }

    /// 通过文件头判断内容是否为 JPEG
    pub fn is_jpeg_bytes(bytes: &[u8]) -> bool {
        matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg))
    }
}
