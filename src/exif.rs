//! EXIF 拍摄时间的读取与改写
//!
//! 使用 `little_exif` 库读取和修改 JPEG 的 `DateTimeOriginal` 字段。
//! 读取和改写各自通过一个 trait 暴露，批处理逻辑只依赖 trait，
//! 测试时可以替换为不接触真实图片的实现。

use chrono::NaiveDateTime;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use crate::date_utils;
use crate::validator::ImageValidator;

/// 读取照片拍摄时间
pub trait TimestampExtractor {
    /// 返回文件的拍摄时间；无法读取时返回 `None`，不区分具体原因
    fn extract(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// 无损改写拍摄时间
pub trait CaptureTimeRewriter {
    /// 返回只替换了拍摄时间字段的新字节流
    fn rewrite(&self, bytes: &[u8], timestamp: &NaiveDateTime) -> io::Result<Vec<u8>>;
}

/// 基于 `little_exif` 的拍摄时间读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl ExifReader {
    pub fn new() -> Self {
        Self
    }

    /// 从内存中的 JPEG 字节流读取 `DateTimeOriginal`
    pub fn read_capture_timestamp(bytes: &[u8]) -> Option<NaiveDateTime> {
        if !ImageValidator::is_jpeg_bytes(bytes) {
            tracing::debug!("内容不是 JPEG，跳过 EXIF 读取");
            return None;
        }

        let metadata = load_metadata(bytes).ok()?;

        // get_tag 返回迭代器，使用 next() 获取第一个匹配项
        match metadata
            .get_tag(&ExifTag::DateTimeOriginal(String::new()))
            .next()
        {
            Some(ExifTag::DateTimeOriginal(datetime_str)) => {
                tracing::debug!("原始 EXIF DateTimeOriginal: {}", datetime_str);
                match date_utils::parse_datetime(datetime_str) {
                    Ok(dt) => Some(dt),
                    Err(e) => {
                        tracing::warn!("无法解析 EXIF 日期时间: {}", e);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}

impl TimestampExtractor for ExifReader {
    fn extract(&self, path: &Path) -> Option<NaiveDateTime> {
        tracing::debug!("获取 EXIF 时间: {:?}", path);

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("读取文件失败: {:?}: {}", path, e);
                return None;
            }
        };

        let result = Self::read_capture_timestamp(&bytes);
        if result.is_none() {
            tracing::debug!("未找到可用的拍摄时间: {:?}", path);
        }
        result
    }
}

/// 基于 `little_exif` 的拍摄时间改写器
///
/// 只替换 `DateTimeOriginal`，其余 EXIF 标签和图像数据原样保留。
/// 无法解析已有 EXIF 时直接报错，而不是用空元数据覆盖。
#[derive(Debug, Default, Clone, Copy)]
pub struct LittleExifRewriter;

impl LittleExifRewriter {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureTimeRewriter for LittleExifRewriter {
    fn rewrite(&self, bytes: &[u8], timestamp: &NaiveDateTime) -> io::Result<Vec<u8>> {
        if !ImageValidator::is_jpeg_bytes(bytes) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "文件内容不是 JPEG",
            ));
        }

        let datetime_str = date_utils::format_exif(timestamp);
        tracing::debug!("设置 EXIF 时间: {}", datetime_str);

        let mut metadata = load_metadata(bytes)?;
        metadata.set_tag(ExifTag::DateTimeOriginal(datetime_str));

        let mut output = bytes.to_vec();
        // little_exif 在某些畸形文件上会 panic，统一转换为错误
        let write_result = panic::catch_unwind(AssertUnwindSafe(|| {
            metadata.write_to_vec(&mut output, FileExtension::JPEG)
        }));

        match write_result {
            Ok(Ok(())) => Ok(output),
            Ok(Err(e)) => Err(io::Error::new(
                e.kind(),
                format!("写入 EXIF 数据失败: {}", e),
            )),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "写入 EXIF 数据时 little_exif 发生 panic",
            )),
        }
    }
}

/// 解析 JPEG 中的 EXIF 元数据，panic 视为解析失败
fn load_metadata(bytes: &[u8]) -> io::Result<Metadata> {
    let buffer = bytes.to_vec();

    let result = panic::catch_unwind(move || Metadata::new_from_vec(&buffer, FileExtension::JPEG));

    match result {
        Ok(Ok(metadata)) => Ok(metadata),
        Ok(Err(e)) => {
            tracing::debug!("little_exif 无法解析 EXIF: {}", e);
            Err(io::Error::new(
                e.kind(),
                format!("读取 EXIF 数据失败: {}", e),
            ))
        }
        Err(_) => {
            tracing::debug!("little_exif 解析 EXIF 时发生 panic");
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "读取 EXIF 数据时 little_exif 发生 panic",
            ))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_extract_date_time_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_taken_at("2024:01:01 10:00:00")).unwrap();

        let taken = ExifReader::new().extract(&path);
        assert_eq!(taken, Some(dt(2024, 1, 1, 10)));
    }

    #[test]
    fn test_extract_missing_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, jpeg_with_tags(vec![])).unwrap();

        assert_eq!(ExifReader::new().extract(&path), None);
    }

    #[test]
    fn test_extract_unparsable_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbled.jpg");
        std::fs::write(&path, jpeg_taken_at("not a date at all")).unwrap();

        assert_eq!(ExifReader::new().extract(&path), None);
    }

    #[test]
    fn test_extract_corrupt_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("corrupt.jpg");
        std::fs::write(&corrupt, b"this is not a jpeg").unwrap();

        let reader = ExifReader::new();
        assert_eq!(reader.extract(&corrupt), None);
        assert_eq!(reader.extract(&dir.path().join("missing.jpg")), None);
    }

    #[test]
    fn test_rewrite_replaces_only_capture_time() {
        let original = jpeg_with_tags(vec![
            ExifTag::DateTimeOriginal("2024:01:01 10:00:00".to_string()),
            ExifTag::Artist("CampSnap".to_string()),
            ExifTag::ImageDescription("beach".to_string()),
        ]);

        let rewritten = LittleExifRewriter::new()
            .rewrite(&original, &dt(2024, 1, 8, 10))
            .unwrap();

        assert_eq!(
            ExifReader::read_capture_timestamp(&rewritten),
            Some(dt(2024, 1, 8, 10))
        );

        let metadata = Metadata::new_from_vec(&rewritten, FileExtension::JPEG).unwrap();
        match metadata.get_tag(&ExifTag::Artist(String::new())).next() {
            Some(ExifTag::Artist(artist)) => assert!(artist.starts_with("CampSnap")),
            other => panic!("Artist 标签丢失: {:?}", other),
        }
        match metadata
            .get_tag(&ExifTag::ImageDescription(String::new()))
            .next()
        {
            Some(ExifTag::ImageDescription(desc)) => assert!(desc.starts_with("beach")),
            other => panic!("ImageDescription 标签丢失: {:?}", other),
        }

        // 像素数据保持不变
        let before = image::load_from_memory(&original).unwrap().to_rgb8();
        let after = image::load_from_memory(&rewritten).unwrap().to_rgb8();
        assert_eq!(before.as_raw(), after.as_raw());
    }

    #[test]
    fn test_rewrite_keeps_other_segments_byte_identical() {
        let xmp: &[u8] = b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>";
        let comment: &[u8] = b"shot on CampSnap";
        let plain = jpeg_with_tags(vec![]);
        let mut original = insert_segments(&plain, &[(0xE1, xmp), (0xFE, comment)]);

        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::DateTimeOriginal("2024:01:01 10:00:00".to_string()));
        metadata.set_tag(ExifTag::Artist("CampSnap".to_string()));
        metadata
            .write_to_vec(&mut original, FileExtension::JPEG)
            .unwrap();

        let rewritten = LittleExifRewriter::new()
            .rewrite(&original, &dt(2024, 1, 8, 10))
            .unwrap();
        assert_eq!(
            ExifReader::read_capture_timestamp(&rewritten),
            Some(dt(2024, 1, 8, 10))
        );

        let (before_segments, before_scan) = split_segments(&original);
        let (after_segments, after_scan) = split_segments(&rewritten);

        let non_exif = |segments: Vec<Vec<u8>>| -> Vec<Vec<u8>> {
            segments.into_iter().filter(|s| !is_exif_segment(s)).collect()
        };
        let before_other = non_exif(before_segments);
        let after_other = non_exif(after_segments);

        assert!(before_other.iter().any(|s| s[1] == 0xE1 && s[4..].starts_with(xmp)));
        assert!(before_other.iter().any(|s| s[1] == 0xFE && &s[4..] == comment));
        assert_eq!(before_other, after_other);

        // SOS 之后的扫描数据逐字节相同
        assert_eq!(before_scan, after_scan);
    }

    #[test]
    fn test_rewrite_rejects_non_jpeg() {
        let result = LittleExifRewriter::new().rewrite(b"garbage", &dt(2024, 1, 1, 0));
        assert!(result.is_err());
    }
}
