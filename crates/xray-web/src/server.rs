//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use xray_core::{Result, XrayError};
use xray_service::PatientService;

use crate::handlers::{
    api_root, create_patient, get_patient, get_patient_xrays, health, list_patients, upload_xrays,
};

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, service: Arc<PatientService>, max_upload_bytes: usize) -> Self {
        let app = create_app(service, max_upload_bytes);
        Self { addr, app }
    }

    /// 运行直到收到 Ctrl-C / SIGTERM，然后等待在途请求完成
    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| XrayError::Internal(format!("Web server failed: {}", e)))?;

        info!("Web server stopped");
        Ok(())
    }
}

/// 构建应用路由
pub fn create_app(service: Arc<PatientService>, max_upload_bytes: usize) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        // API路由
        .nest("/api", api_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(service)
}

/// API 路由
fn api_routes() -> Router<Arc<PatientService>> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:patient_id", get(get_patient))
        .route(
            "/patients/:patient_id/xrays",
            get(get_patient_xrays).post(upload_xrays),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
