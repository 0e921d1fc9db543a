//! S3兼容对象存储

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use xray_core::{utils, Result, XrayError};

use crate::storage::{ImageStorage, StorageBackend};

/// S3存储，对象键为 xrays/<patient_id>/<filename>
#[derive(Debug, Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    url_base: String,
}

impl S3Storage {
    /// 按凭据构建S3客户端
    pub fn connect(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        access_key_id: &str,
        secret_access_key: &str,
        public_url: Option<&str>,
    ) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key);

        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| XrayError::Config(format!("Invalid S3 configuration: {}", e)))?;

        let url_base = public_url_base(bucket, region, endpoint, public_url);
        Ok(Self::with_store(Arc::new(store), url_base))
    }

    /// 使用已有的对象存储实现
    pub fn with_store(store: Arc<dyn ObjectStore>, url_base: impl Into<String>) -> Self {
        Self {
            store,
            url_base: url_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// 对象的公开URL，`key` 为存储中实际的对象键
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_base, utils::encode_key_path(key))
    }
}

/// 公开URL前缀：显式配置 > 自定义端点 > AWS虚拟主机风格
pub fn public_url_base(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    public_url: Option<&str>,
) -> String {
    if let Some(public_url) = public_url {
        return public_url.trim_end_matches('/').to_string();
    }

    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

#[async_trait]
impl ImageStorage for S3Storage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::S3
    }

    async fn store(
        &self,
        patient_id: i32,
        filename: &str,
        _content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String> {
        let key = utils::remote_object_key(patient_id, filename);
        let location = ObjectPath::from(key.as_str());

        self.store
            .put(&location, Bytes::copy_from_slice(data))
            .await
            .map_err(|e| XrayError::Storage(format!("S3 upload failed: {}", e)))?;

        // 对象键以 object_store 规范化后的路径为准
        tracing::debug!("Uploaded {} bytes to s3 key {}", data.len(), location);
        Ok(self.public_url(location.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_public_url_base_rules() {
        assert_eq!(
            public_url_base("scans", "eu-west-1", None, None),
            "https://scans.s3.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            public_url_base("scans", "us-east-1", Some("http://minio:9000/"), None),
            "http://minio:9000/scans"
        );
        assert_eq!(
            public_url_base("scans", "us-east-1", Some("http://minio:9000"), Some("https://cdn.example.com/")),
            "https://cdn.example.com"
        );
    }

    #[tokio::test]
    async fn test_store_puts_object_under_patient_prefix() {
        let memory = Arc::new(InMemory::new());
        let storage = S3Storage::with_store(memory.clone(), "https://scans.s3.eu-west-1.amazonaws.com/");

        let url = storage
            .store(9, "knee.jpeg", Some("image/jpeg"), b"jpeg-bytes")
            .await
            .unwrap();

        assert_eq!(url, "https://scans.s3.eu-west-1.amazonaws.com/xrays/9/knee.jpeg");

        let stored = memory
            .get(&ObjectPath::from("xrays/9/knee.jpeg"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.as_ref(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_url_addresses_stored_key_for_reserved_characters() {
        let memory = Arc::new(InMemory::new());
        let base = "https://scans.s3.eu-west-1.amazonaws.com";
        let storage = S3Storage::with_store(memory.clone(), base);

        let first = storage.store(1, "a#b.png", None, b"first").await.unwrap();
        let second = storage.store(1, "50% left.png", None, b"second").await.unwrap();

        let cases = [
            (first, "xrays/1/a%23b.png", b"first".as_slice()),
            (second, "xrays/1/50%25 left.png", b"second".as_slice()),
        ];

        for (url, stored_key, data) in cases {
            assert!(!url.contains('#'));
            assert!(!url.contains(' '));

            // S3 对请求路径解码一次后得到对象键
            let path = url.strip_prefix(&format!("{}/", base)).unwrap();
            let key = urlencoding::decode(path).unwrap().into_owned();
            assert_eq!(key, stored_key);

            let stored = memory
                .get(&ObjectPath::parse(&key).unwrap())
                .await
                .unwrap()
                .bytes()
                .await
                .unwrap();
            assert_eq!(stored.as_ref(), data);
        }
    }

    #[test]
    fn test_connect_builds_client() {
        let storage = S3Storage::connect(
            "scans",
            "us-east-1",
            Some("http://localhost:9000"),
            "minio",
            "minio-secret",
            None,
        )
        .unwrap();

        assert_eq!(storage.public_url("xrays/1/a.png"), "http://localhost:9000/scans/xrays/1/a.png");
    }
}
