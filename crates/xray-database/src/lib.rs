//! # X-Ray数据库模块
//!
//! 负责患者与X光结果的持久化，提供PostgreSQL连接池、建表、CRUD查询，
//! 以及供业务层使用的仓储接口（含内存实现）。

pub mod connection;
pub mod memory;
pub mod models;
pub mod queries;
pub mod repository;

// 重新导出主要类型
pub use connection::{DatabasePool, PoolSettings};
pub use memory::MemoryRepository;
pub use models::*;
pub use queries::DatabaseQueries;
pub use repository::PatientRepository;
