//! # X-Ray业务模块
//!
//! 协调校验、持久化、存储后端和影像分析的编排层，所有HTTP端点都委托到这里。

pub mod analysis;
pub mod service;

pub use analysis::{ImageAnalyzer, StubAnalyzer};
pub use service::PatientService;
