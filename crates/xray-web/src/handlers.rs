//! HTTP处理器

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use xray_core::{NewPatient, PatientDetail, UploadFile, UploadSummary, Xray, XrayError};
use xray_service::PatientService;

use crate::error::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to X-Ray Analysis API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "patients": "/api/patients",
            "xrays": "/api/patients/{id}/xrays"
        }
    }))
}

/// 健康检查处理器，总是返回200，正文区分数据库状态
pub async fn health(State(service): State<Arc<PatientService>>) -> impl IntoResponse {
    match service.health_check().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "database": "connected",
            "message": "PostgreSQL connected successfully",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.message(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }
    }
}

/// 创建患者
pub async fn create_patient(
    State(service): State<Arc<PatientService>>,
    Json(payload): Json<NewPatient>,
) -> ApiResult<Json<PatientDetail>> {
    info!("Creating patient");
    Ok(Json(service.create_patient(payload).await?))
}

/// 获取患者及其X光
pub async fn get_patient(
    State(service): State<Arc<PatientService>>,
    Path(patient_id): Path<i32>,
) -> ApiResult<Json<PatientDetail>> {
    Ok(Json(service.get_patient(patient_id).await?))
}

/// 患者列表
pub async fn list_patients(
    State(service): State<Arc<PatientService>>,
) -> ApiResult<Json<Vec<PatientDetail>>> {
    Ok(Json(service.list_patients().await?))
}

/// 患者的X光列表
pub async fn get_patient_xrays(
    State(service): State<Arc<PatientService>>,
    Path(patient_id): Path<i32>,
) -> ApiResult<Json<Vec<Xray>>> {
    Ok(Json(service.get_patient_xrays(patient_id).await?))
}

/// 上传X光影像（multipart，每个带文件名的部分视为一个文件）
pub async fn upload_xrays(
    State(service): State<Arc<PatientService>>,
    Path(patient_id): Path<i32>,
    multipart: Multipart,
) -> ApiResult<Json<UploadSummary>> {
    let files = read_upload_files(multipart).await?;
    info!(
        "Received {} file(s) for patient {}",
        files.len(),
        patient_id
    );

    Ok(Json(service.upload_xrays(patient_id, files).await?))
}

async fn read_upload_files(mut multipart: Multipart) -> Result<Vec<UploadFile>, XrayError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&format!("Failed to read file {}", filename), e))?;

        files.push(UploadFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    Ok(files)
}

/// 超出请求体上限时返回413，其余解析错误返回400
fn multipart_error(context: &str, err: MultipartError) -> XrayError {
    let message = format!("{}: {}", context, err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        XrayError::PayloadTooLarge(message)
    } else {
        XrayError::Validation(message)
    }
}
