//! 错误定义模块

use thiserror::Error;

/// X光分析系统统一错误类型
#[derive(Error, Debug)]
pub enum XrayError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("请求体过大: {0}")]
    PayloadTooLarge(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl XrayError {
    /// 面向调用方的简短消息，不带分类前缀
    pub fn message(&self) -> String {
        match self {
            XrayError::Config(msg)
            | XrayError::Database(msg)
            | XrayError::Storage(msg)
            | XrayError::Validation(msg)
            | XrayError::NotFound(msg)
            | XrayError::PayloadTooLarge(msg)
            | XrayError::Internal(msg) => msg.clone(),
            XrayError::Io(e) => e.to_string(),
            XrayError::Serialization(e) => e.to_string(),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for XrayError {
    fn from(err: sqlx::Error) -> Self {
        XrayError::Database(err.to_string())
    }
}

/// X光分析系统统一结果类型
pub type Result<T> = std::result::Result<T, XrayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_category() {
        let err = XrayError::NotFound("Patient not found".to_string());
        assert_eq!(err.message(), "Patient not found");
        assert_eq!(err.to_string(), "资源未找到: Patient not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: XrayError = io.into();
        assert!(matches!(err, XrayError::Io(_)));
        assert_eq!(err.message(), "read-only");
    }
}
