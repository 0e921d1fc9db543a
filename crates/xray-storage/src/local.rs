//! 本地磁盘存储

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use xray_core::{utils, Result};

use crate::storage::{ImageStorage, StorageBackend};

/// 本地存储，文件写到 <upload_dir>/<patient_id>_<filename>
#[derive(Debug, Clone)]
pub struct LocalStorage {
    upload_dir: PathBuf,
}

impl LocalStorage {
    /// 创建存储并确保上传目录存在
    pub fn new(upload_dir: impl AsRef<Path>) -> Result<Self> {
        let upload_dir = upload_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn file_path(&self, patient_id: i32, filename: &str) -> PathBuf {
        self.upload_dir
            .join(utils::local_file_name(patient_id, filename))
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn store(
        &self,
        patient_id: i32,
        filename: &str,
        _content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String> {
        let full_path = self.file_path(patient_id, filename);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        tracing::debug!("Stored {} bytes at {}", data.len(), full_path.display());
        Ok(full_path.to_string_lossy().to_string())
    }
}
