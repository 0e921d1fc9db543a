//! 数据库连接管理

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use xray_core::Result;

/// 连接池参数
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub options: PgConnectOptions,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

/// 数据库连接池
///
/// 启动时创建一次，之后在各请求间共享；每次查询从池中借出连接，用完自动归还。
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 建立连接池
    pub async fn connect(settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout)
            .idle_timeout(Some(settings.idle_timeout))
            .test_before_acquire(true)
            .connect_with(settings.options.clone())
            .await?;

        tracing::info!(
            "Database pool established (max_connections={})",
            settings.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行 SELECT 1 检查连通性
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// 关闭连接池，等待借出的连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
