//! # X-Ray存储模块
//!
//! 负责上传影像字节的持久化，按配置在本地磁盘、S3兼容对象存储和Supabase存储之间三选一。

pub mod local;
pub mod s3;
pub mod storage;
pub mod supabase;

pub use local::*;
pub use s3::*;
pub use storage::*;
pub use supabase::*;
