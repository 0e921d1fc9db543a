//! # X-Ray Web模块
//!
//! 以REST接口暴露患者与X光服务，并把领域错误映射为HTTP状态码。

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_app, WebServer};
