//! 配置管理
//!
//! 分层加载：内置默认值 → 旧部署使用的环境变量 → 配置文件 → XRAY__ 前缀环境变量。
//! 命令行覆盖由可执行程序在最后应用。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use xray_storage::StorageConfig;

use crate::logging::LogFormat;

/// 默认配置文件（不存在时忽略）
pub const DEFAULT_CONFIG_PATH: &str = "config/xray";

/// 旧部署的环境变量到配置键的映射
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASS", "database.password"),
    ("DB_NAME", "database.name"),
    ("STORAGE_BACKEND", "storage.backend"),
    ("S3_BUCKET", "storage.s3.bucket"),
    ("S3_ENDPOINT", "storage.s3.endpoint"),
    ("S3_PUBLIC_URL", "storage.s3.public_url"),
    ("AWS_REGION", "storage.s3.region"),
    ("AWS_ACCESS_KEY_ID", "storage.s3.access_key_id"),
    ("AWS_SECRET_ACCESS_KEY", "storage.s3.secret_access_key"),
    ("SUPABASE_URL", "storage.supabase.url"),
    ("SUPABASE_KEY", "storage.supabase.key"),
];

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 请求体上限（字节）
    pub max_upload_bytes: usize,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 完整连接串，优先于分项配置
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 空闲连接回收（秒）
    pub idle_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 过滤级别，如 "info" 或 "xray_web=debug,info"
    pub level: String,
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024, // 25MB
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: 5432,
            user: None,
            password: None,
            name: None,
            max_connections: 10,
            connect_timeout_secs: 10,
            idle_timeout_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl DatabaseConfig {
    /// 连接参数：优先解析 url，否则由分项构建
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return PgConnectOptions::from_str(url.trim()).context("Invalid database.url");
        }

        let host = self
            .host
            .as_deref()
            .context("database.url or database.host is required")?;
        let user = self.user.as_deref().context("database.user is required")?;
        let name = self.name.as_deref().context("database.name is required")?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(self.port)
            .username(user)
            .database(name);
        if let Some(password) = self.password.as_deref() {
            options = options.password(password);
        }

        Ok(options)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl AppConfig {
    /// 从进程环境和可选配置文件加载
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, std::env::vars().collect())
    }

    /// 从给定的环境变量集合加载
    pub fn load_from(config_path: Option<&str>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        for (var, key) in LEGACY_ENV_KEYS {
            if let Some(value) = env.get(*var).filter(|v| !v.is_empty()) {
                builder = builder
                    .set_default(*key, value.clone())
                    .with_context(|| format!("Failed to apply {}", var))?;
            }
        }

        let file = match config_path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let settings = builder
            .add_source(file)
            .add_source(
                Environment::with_prefix("XRAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.into_iter().collect())),
            )
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// 启动前校验
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Invalid server port: server.port cannot be 0");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("Invalid upload limit: server.max_upload_bytes cannot be 0");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("Invalid database max connections: database.max_connections cannot be 0");
        }
        self.database.connect_options()?;
        self.storage
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid storage configuration: {}", e.message()))?;

        Ok(())
    }

    /// 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
