//! 影像存储管理

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use xray_core::{Result, XrayError};

use crate::local::LocalStorage;
use crate::s3::S3Storage;
use crate::supabase::SupabaseStorage;

/// 存储类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
    Supabase,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::S3 => "s3",
            StorageBackend::Supabase => "supabase",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = XrayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            "supabase" => Ok(StorageBackend::Supabase),
            other => Err(XrayError::Config(format!(
                "Unknown storage backend {:?}, expected one of: local, s3, supabase",
                other
            ))),
        }
    }
}

/// 影像存储能力
///
/// 写入字节并返回可检索的位置标识（本地路径或公开URL）。
#[async_trait]
pub trait ImageStorage: Send + Sync {
    fn backend(&self) -> StorageBackend;

    async fn store(
        &self,
        patient_id: i32,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String>;
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    /// 上传目录
    pub upload_dir: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
        }
    }
}

/// S3兼容对象存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3StorageConfig {
    /// 桶名
    pub bucket: Option<String>,
    /// 区域
    pub region: Option<String>,
    /// 端点URL（非AWS的S3兼容服务）
    pub endpoint: Option<String>,
    /// 访问密钥
    pub access_key_id: Option<String>,
    /// 密钥
    pub secret_access_key: Option<String>,
    /// 公开访问URL前缀，覆盖默认拼接规则
    pub public_url: Option<String>,
}

/// Supabase存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseStorageConfig {
    /// 项目URL
    pub url: Option<String>,
    /// 服务密钥
    pub key: Option<String>,
    /// 桶名
    pub bucket: String,
}

impl Default for SupabaseStorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            bucket: "X-ray-images".to_string(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 当前启用的后端，必须显式指定
    pub backend: Option<StorageBackend>,
    pub local: LocalStorageConfig,
    pub s3: S3StorageConfig,
    pub supabase: SupabaseStorageConfig,
}

fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(XrayError::Config(format!("{} is required", field))),
    }
}

impl StorageConfig {
    /// 已选后端
    pub fn selected_backend(&self) -> Result<StorageBackend> {
        self.backend.ok_or_else(|| {
            XrayError::Config(
                "storage.backend must be set to one of: local, s3, supabase".to_string(),
            )
        })
    }

    /// 校验已选后端所需字段
    pub fn validate(&self) -> Result<()> {
        match self.selected_backend()? {
            StorageBackend::Local => {
                if self.local.upload_dir.trim().is_empty() {
                    return Err(XrayError::Config(
                        "storage.local.upload_dir is required".to_string(),
                    ));
                }
            }
            StorageBackend::S3 => {
                require(&self.s3.bucket, "storage.s3.bucket")?;
                require(&self.s3.region, "storage.s3.region")?;
                require(&self.s3.access_key_id, "storage.s3.access_key_id")?;
                require(&self.s3.secret_access_key, "storage.s3.secret_access_key")?;
            }
            StorageBackend::Supabase => {
                require(&self.supabase.url, "storage.supabase.url")?;
                require(&self.supabase.key, "storage.supabase.key")?;
                if self.supabase.bucket.trim().is_empty() {
                    return Err(XrayError::Config(
                        "storage.supabase.bucket is required".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// 按配置构建存储后端，进程启动时调用一次
pub fn build_storage(config: &StorageConfig) -> Result<Arc<dyn ImageStorage>> {
    config.validate()?;

    let storage: Arc<dyn ImageStorage> = match config.selected_backend()? {
        StorageBackend::Local => Arc::new(LocalStorage::new(&config.local.upload_dir)?),
        StorageBackend::S3 => {
            let s3 = &config.s3;
            Arc::new(S3Storage::connect(
                require(&s3.bucket, "storage.s3.bucket")?,
                require(&s3.region, "storage.s3.region")?,
                s3.endpoint.as_deref(),
                require(&s3.access_key_id, "storage.s3.access_key_id")?,
                require(&s3.secret_access_key, "storage.s3.secret_access_key")?,
                s3.public_url.as_deref(),
            )?)
        }
        StorageBackend::Supabase => Arc::new(SupabaseStorage::new(
            require(&config.supabase.url, "storage.supabase.url")?,
            require(&config.supabase.key, "storage.supabase.key")?,
            &config.supabase.bucket,
        )?),
    };

    tracing::info!("Storage backend initialised: {}", storage.backend());
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(" local ".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("debug".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_backend_must_be_explicit() {
        let config = StorageConfig::default();
        assert!(matches!(config.validate(), Err(XrayError::Config(_))));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let mut config = StorageConfig {
            backend: Some(StorageBackend::S3),
            ..Default::default()
        };
        config.s3.bucket = Some("scans".to_string());
        config.s3.region = Some("eu-west-1".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.s3.access_key_id"));

        config.s3.access_key_id = Some("AKIA".to_string());
        config.s3.secret_access_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_supabase_requires_url_and_key() {
        let mut config = StorageConfig {
            backend: Some(StorageBackend::Supabase),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.supabase.url = Some("https://project.supabase.co".to_string());
        config.supabase.key = Some("service-key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig {
            backend: Some(StorageBackend::Local),
            ..Default::default()
        };
        config.local.upload_dir = dir.path().join("uploads").to_string_lossy().to_string();

        let storage = build_storage(&config).unwrap();
        assert_eq!(storage.backend(), StorageBackend::Local);
        assert!(dir.path().join("uploads").is_dir());
    }
}
