//! 通用工具函数

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::error::{Result, XrayError};

/// 允许上传的影像扩展名（小写，不含点）
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 远程存储中X光影像的键前缀
pub const XRAY_KEY_PREFIX: &str = "xrays";

/// 年龄只取年份差
pub fn age_in_years(date_of_birth: NaiveDateTime, today: NaiveDateTime) -> i32 {
    today.year() - date_of_birth.year()
}

/// 去掉客户端提供的目录部分，只保留文件名
pub fn sanitize_filename(filename: &str) -> Result<String> {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(XrayError::Validation(format!(
            "Invalid file name: {:?}",
            filename
        )));
    }

    Ok(name.to_string())
}

/// 校验上传文件名，返回清理后的文件名
pub fn validate_image_filename(filename: &str) -> Result<String> {
    let name = sanitize_filename(filename)?;

    let extension = Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(name),
        _ => Err(XrayError::Validation(
            "Invalid file type. Only JPG/JPEG and PNG allowed.".to_string(),
        )),
    }
}

/// 对象存储键: xrays/<patient_id>/<filename>
pub fn remote_object_key(patient_id: i32, filename: &str) -> String {
    format!("{}/{}/{}", XRAY_KEY_PREFIX, patient_id, filename)
}

/// 按段百分号编码对象键，用于拼接URL路径，分隔符 `/` 保留
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// 本地文件名: <patient_id>_<filename>
pub fn local_file_name(patient_id: i32, filename: &str) -> String {
    format!("{}_{}", patient_id, filename)
}

/// 解析出生日期，支持RFC 3339、无时区时间戳和纯日期
pub fn parse_birth_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// serde反序列化适配
pub fn deserialize_birth_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_birth_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date_of_birth: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_age_ignores_month_and_day() {
        assert_eq!(age_in_years(at(1990, 12, 31), at(2024, 1, 1)), 34);
        assert_eq!(age_in_years(at(1990, 1, 1), at(2024, 12, 31)), 34);
    }

    #[test]
    fn test_validate_image_filename() {
        assert_eq!(validate_image_filename("chest.png").unwrap(), "chest.png");
        assert_eq!(validate_image_filename("CHEST.JPG").unwrap(), "CHEST.JPG");
        assert_eq!(validate_image_filename("scan.jpeg").unwrap(), "scan.jpeg");

        assert!(validate_image_filename("scan.gif").is_err());
        assert!(validate_image_filename("scan").is_err());
        assert!(validate_image_filename(".png").is_err());
        assert!(validate_image_filename("scan.png.exe").is_err());
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/chest.png").unwrap(), "chest.png");
        assert_eq!(sanitize_filename("C:\\images\\knee.jpg").unwrap(), "knee.jpg");
        assert!(sanitize_filename("uploads/").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_storage_keys() {
        assert_eq!(remote_object_key(7, "a.png"), "xrays/7/a.png");
        assert_eq!(local_file_name(7, "a.png"), "7_a.png");
    }

    #[test]
    fn test_encode_key_path_keeps_separators() {
        assert_eq!(encode_key_path("xrays/7/a.png"), "xrays/7/a.png");
        assert_eq!(encode_key_path("xrays/7/a#b.png"), "xrays/7/a%23b.png");
        assert_eq!(encode_key_path("xrays/7/50% left.png"), "xrays/7/50%25%20left.png");
        assert_eq!(encode_key_path("xrays/7/a?x=1.png"), "xrays/7/a%3Fx%3D1.png");
    }

    #[test]
    fn test_parse_birth_date_formats() {
        assert_eq!(parse_birth_date("1990-05-17"), Some(at(1990, 5, 17)));
        assert_eq!(parse_birth_date("1990-05-17T00:00:00"), Some(at(1990, 5, 17)));
        assert_eq!(parse_birth_date("1990-05-17T02:00:00+02:00"), Some(at(1990, 5, 17)));
        assert_eq!(parse_birth_date("17/05/1990"), None);
    }
}
