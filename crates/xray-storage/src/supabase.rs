//! Supabase存储

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use xray_core::{utils, Result, XrayError};

use crate::storage::{ImageStorage, StorageBackend};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Supabase存储，通过其REST接口上传，返回公开URL
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, key: &str, bucket: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| XrayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// 上传端点
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            utils::encode_key_path(key)
        )
    }

    /// 公开访问URL
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            utils::encode_key_path(key)
        )
    }
}

#[async_trait]
impl ImageStorage for SupabaseStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Supabase
    }

    async fn store(
        &self,
        patient_id: i32,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String> {
        let key = utils::remote_object_key(patient_id, filename);

        // 同名文件覆盖写入，重复上传不报错
        let response = self
            .client
            .post(self.object_url(&key))
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .header("x-upsert", "true")
            .header(CONTENT_TYPE, content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| XrayError::Storage(format!("Cloud upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(XrayError::Storage(format!(
                "Cloud upload failed: {} {}",
                status, body
            )));
        }

        tracing::debug!("Uploaded {} bytes to supabase key {}", data.len(), key);
        Ok(self.public_url(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        Router,
    };
    use std::sync::{Arc, Mutex};

    /// 本地服务收到的上传请求
    #[derive(Debug, Clone)]
    struct Received {
        path: String,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    type Log = Arc<Mutex<Vec<Received>>>;

    async fn record(State(log): State<Log>, uri: Uri, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
        let path = uri.path().to_string();
        let rejected = path.contains("/missing-bucket/");
        log.lock().unwrap().push(Received {
            path,
            headers,
            body: body.to_vec(),
        });

        if rejected {
            (StatusCode::BAD_REQUEST, r#"{"error":"Bucket not found"}"#.to_string())
        } else {
            (StatusCode::OK, r#"{"Key":"ok"}"#.to_string())
        }
    }

    /// 启动一个记录请求的本地HTTP服务，返回其地址
    async fn spawn_storage_service() -> (String, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(record).with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), log)
    }

    #[test]
    fn test_urls() {
        let storage =
            SupabaseStorage::new("https://abc.supabase.co/", "service-key", "X-ray-images").unwrap();

        assert_eq!(
            storage.object_url("xrays/2/a.png"),
            "https://abc.supabase.co/storage/v1/object/X-ray-images/xrays/2/a.png"
        );
        assert_eq!(
            storage.public_url("xrays/2/a.png"),
            "https://abc.supabase.co/storage/v1/object/public/X-ray-images/xrays/2/a.png"
        );
    }

    #[test]
    fn test_urls_encode_reserved_characters() {
        let storage =
            SupabaseStorage::new("https://abc.supabase.co", "service-key", "X-ray-images").unwrap();

        let url = reqwest::Url::parse(&storage.object_url("xrays/1/a#b.png")).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/storage/v1/object/X-ray-images/xrays/1/a%23b.png");

        let url = reqwest::Url::parse(&storage.public_url("xrays/1/50% left.png")).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(
            url.path(),
            "/storage/v1/object/public/X-ray-images/xrays/1/50%25%20left.png"
        );
    }

    #[tokio::test]
    async fn test_store_uploads_with_service_headers() {
        let (base_url, log) = spawn_storage_service().await;
        let storage = SupabaseStorage::new(&base_url, "service-key", "X-ray-images").unwrap();

        let location = storage
            .store(3, "chest.png", Some("image/png"), b"png-bytes")
            .await
            .unwrap();

        assert_eq!(
            location,
            format!("{}/storage/v1/object/public/X-ray-images/xrays/3/chest.png", base_url)
        );

        let received = log.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        let request = &received[0];
        assert_eq!(request.path, "/storage/v1/object/X-ray-images/xrays/3/chest.png");
        assert_eq!(request.headers["authorization"], "Bearer service-key");
        assert_eq!(request.headers["apikey"], "service-key");
        assert_eq!(request.headers["x-upsert"], "true");
        assert_eq!(request.headers["content-type"], "image/png");
        assert_eq!(request.body, b"png-bytes");
    }

    #[tokio::test]
    async fn test_distinct_names_with_reserved_characters_stay_distinct() {
        let (base_url, log) = spawn_storage_service().await;
        let storage = SupabaseStorage::new(&base_url, "service-key", "X-ray-images").unwrap();

        let first = storage.store(1, "a#b.png", None, b"b").await.unwrap();
        let second = storage.store(1, "a#c.png", None, b"c").await.unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with("/xrays/1/a%23b.png"));

        let received = log.lock().unwrap().clone();
        let paths: Vec<_> = received.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/storage/v1/object/X-ray-images/xrays/1/a%23b.png",
                "/storage/v1/object/X-ray-images/xrays/1/a%23c.png",
            ]
        );
        assert_eq!(received[0].headers["content-type"], DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_rejected_upload_maps_to_storage_error() {
        let (base_url, log) = spawn_storage_service().await;
        let storage = SupabaseStorage::new(&base_url, "service-key", "missing-bucket").unwrap();

        let err = storage
            .store(1, "a.png", Some("image/png"), b"png")
            .await
            .unwrap_err();

        match err {
            XrayError::Storage(message) => {
                assert!(message.contains("400"), "{}", message);
                assert!(message.contains("Bucket not found"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_maps_to_storage_error() {
        // 先占用端口再释放，确保没有服务在监听
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let storage =
            SupabaseStorage::new(&format!("http://127.0.0.1:{}", port), "key", "X-ray-images")
                .unwrap();

        let err = storage
            .store(1, "a.png", Some("image/png"), b"png")
            .await
            .unwrap_err();
        assert!(matches!(err, XrayError::Storage(_)));
    }
}
