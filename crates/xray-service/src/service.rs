//! 患者与X光服务
//!
//! 唯一的编排入口：校验、持久化、存储后端分发和分析调用都在这里串起来。

use std::collections::HashMap;
use std::sync::Arc;
use xray_core::{
    utils, AnalysisResult, NewPatient, NewXray, PatientDetail, Result, UploadFile, UploadSummary,
    UploadedXray, Xray, XrayError,
};
use xray_database::PatientRepository;
use xray_storage::ImageStorage;

use crate::analysis::ImageAnalyzer;

/// 患者服务
///
/// 仓储、存储后端和分析器在启动时构建一次，通过 `Arc` 注入并在请求间共享。
#[derive(Clone)]
pub struct PatientService {
    repository: Arc<dyn PatientRepository>,
    storage: Arc<dyn ImageStorage>,
    analyzer: Arc<dyn ImageAnalyzer>,
}

impl PatientService {
    /// 创建新的患者服务
    pub fn new(
        repository: Arc<dyn PatientRepository>,
        storage: Arc<dyn ImageStorage>,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Self {
        Self {
            repository,
            storage,
            analyzer,
        }
    }

    /// 创建患者
    pub async fn create_patient(&self, patient: NewPatient) -> Result<PatientDetail> {
        if patient.name.trim().is_empty() {
            return Err(XrayError::Validation("Patient name must not be empty".to_string()));
        }

        let created = self.repository.create_patient(&patient).await?;
        tracing::info!("Created patient {}", created.id);
        Ok(PatientDetail::new(created, Vec::new()))
    }

    /// 获取患者及其全部X光
    pub async fn get_patient(&self, patient_id: i32) -> Result<PatientDetail> {
        let patient = self
            .repository
            .find_patient(patient_id)
            .await?
            .ok_or_else(|| XrayError::NotFound("Patient not found".to_string()))?;

        let xrays = self.repository.list_xrays_for_patient(patient_id).await?;
        Ok(PatientDetail::new(patient, xrays))
    }

    /// 列出全部患者，不分页
    pub async fn list_patients(&self) -> Result<Vec<PatientDetail>> {
        let patients = self.repository.list_patients().await?;

        let mut xrays_by_patient: HashMap<i32, Vec<Xray>> = HashMap::new();
        for xray in self.repository.list_all_xrays().await? {
            xrays_by_patient.entry(xray.patient_id).or_default().push(xray);
        }

        Ok(patients
            .into_iter()
            .map(|patient| {
                let xrays = xrays_by_patient.remove(&patient.id).unwrap_or_default();
                PatientDetail::new(patient, xrays)
            })
            .collect())
    }

    /// 获取患者的X光列表
    ///
    /// 患者不存在和患者没有X光都返回 NotFound，但消息不同。
    pub async fn get_patient_xrays(&self, patient_id: i32) -> Result<Vec<Xray>> {
        if self.repository.find_patient(patient_id).await?.is_none() {
            return Err(XrayError::NotFound("Patient not found".to_string()));
        }

        let xrays = self.repository.list_xrays_for_patient(patient_id).await?;
        if xrays.is_empty() {
            return Err(XrayError::NotFound("No X-rays found".to_string()));
        }
        Ok(xrays)
    }

    /// 上传并分析X光影像
    ///
    /// 文件逐个顺序处理，每个文件成功后立即提交。第N个文件失败时返回错误，
    /// 前N-1个文件的记录保留，不做批次回滚。
    pub async fn upload_xrays(
        &self,
        patient_id: i32,
        files: Vec<UploadFile>,
    ) -> Result<UploadSummary> {
        // 先确认患者存在，再做任何存储写入
        if self.repository.find_patient(patient_id).await?.is_none() {
            return Err(XrayError::NotFound("Patient not found".to_string()));
        }

        if files.is_empty() {
            return Err(XrayError::Validation("No files provided".to_string()));
        }

        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let filename = match utils::validate_image_filename(&file.filename) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(
                        "Rejected upload {:?} for patient {}: {}",
                        file.filename,
                        patient_id,
                        e
                    );
                    return Err(e);
                }
            };

            let location = self
                .storage
                .store(
                    patient_id,
                    &filename,
                    file.content_type.as_deref(),
                    &file.data,
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Storage write failed for {} (patient {}): {}",
                        filename,
                        patient_id,
                        e
                    );
                    match e {
                        XrayError::Storage(_) => e,
                        other => XrayError::Storage(other.message()),
                    }
                })?;

            let analysis = self.analyze_image(&location).await?;

            let xray = self
                .repository
                .insert_xray(&NewXray {
                    patient_id,
                    x_ray_image: location,
                    result: analysis.result,
                    confidence: analysis.confidence,
                })
                .await?;

            tracing::debug!("Stored xray {} for patient {}", xray.id, patient_id);

            // 摘要回显客户端提交的原始文件名
            results.push(UploadedXray {
                id: xray.id,
                filename: file.filename,
                result: xray.result,
                confidence: xray.confidence,
            });
        }

        tracing::info!(
            "Uploaded {} xray(s) for patient {} via {} storage",
            results.len(),
            patient_id,
            self.storage.backend()
        );

        Ok(UploadSummary {
            patient_id,
            uploaded_count: results.len(),
            results,
        })
    }

    /// 调用分析器
    pub async fn analyze_image(&self, image_location: &str) -> Result<AnalysisResult> {
        self.analyzer.analyze(image_location).await
    }

    /// 数据库连通性
    pub async fn health_check(&self) -> Result<()> {
        self.repository.ping().await
    }
}
