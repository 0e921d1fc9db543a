//! # X-Ray管理模块
//!
//! 提供分层配置加载、启动校验和日志初始化。

pub mod config;
pub mod logging;

pub use config::{AppConfig, DatabaseConfig, LoggingConfig, ServerConfig};
pub use logging::{init_logging, LogFormat};
