//! X光分析服务器主程序

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use xray_admin::{init_logging, AppConfig, LogFormat};
use xray_database::{DatabasePool, DatabaseQueries, PoolSettings};
use xray_service::{PatientService, StubAnalyzer};
use xray_storage::build_storage;
use xray_web::WebServer;

/// 服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "xray-server")]
#[command(about = "X-Ray Analysis API 服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, env = "XRAY_CONFIG")]
    config: Option<String>,

    /// 监听主机，覆盖配置
    #[arg(long)]
    host: Option<String>,

    /// 监听端口，覆盖配置
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别，覆盖配置
    #[arg(short, long)]
    log_level: Option<String>,

    /// 以JSON格式输出日志
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 初始化日志
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = if args.json_logs {
        LogFormat::Json
    } else {
        config.logging.format
    };
    init_logging(&level, format)?;

    info!(
        "Configuration loaded{}",
        args.config
            .as_deref()
            .map(|p| format!(" from: {}", p))
            .unwrap_or_default()
    );
    config.validate()?;
    info!("Configuration validation passed");

    info!("启动X光分析服务器...");
    info!("  监听地址: {}", config.bind_address());
    info!("  存储后端: {}", config.storage.selected_backend()?);

    // 数据库
    let settings = PoolSettings {
        options: config.database.connect_options()?,
        max_connections: config.database.max_connections,
        connect_timeout: config.database.connect_timeout(),
        idle_timeout: config.database.idle_timeout(),
    };
    let pool = DatabasePool::connect(&settings)
        .await
        .context("Failed to connect to database")?;
    DatabaseQueries::new(&pool)
        .create_tables()
        .await
        .context("Failed to create database tables")?;

    // 存储后端与分析器，启动时构建一次
    let storage = build_storage(&config.storage)?;
    let service = Arc::new(PatientService::new(
        Arc::new(pool.clone()),
        storage,
        Arc::new(StubAnalyzer::new()),
    ));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.bind_address()))?;

    let server = WebServer::new(addr, service, config.server.max_upload_bytes);
    let outcome = server.run().await;

    pool.close().await;

    if let Err(e) = outcome {
        error!("服务器运行失败: {}", e);
        return Err(e.into());
    }

    info!("服务器已停止");
    Ok(())
}
