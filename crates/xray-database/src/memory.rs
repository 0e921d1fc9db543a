//! 内存仓储
//!
//! 行为与PostgreSQL实现一致：自增ID、外键检查、插入顺序。用于测试和本地试用。

use async_trait::async_trait;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use xray_core::{NewPatient, NewXray, Patient, Result, Xray, XrayError};

use crate::repository::PatientRepository;

#[derive(Debug, Default)]
struct MemoryState {
    patients: Vec<Patient>,
    xrays: Vec<Xray>,
}

/// 基于内存的仓储实现
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟数据库断开，之后所有操作返回数据库错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(XrayError::Database("connection refused".to_string()));
        }
        Ok(())
    }

    /// 当前X光记录数
    pub async fn xray_count(&self) -> usize {
        self.state.read().await.xrays.len()
    }
}

#[async_trait]
impl PatientRepository for MemoryRepository {
    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let now = Local::now().naive_local();
        let record = Patient {
            id: state.patients.len() as i32 + 1,
            name: patient.name.clone(),
            date_of_birth: patient.date_of_birth,
            gender: patient.gender,
            created_at: now,
            updated_at: now,
        };
        state.patients.push(record.clone());
        Ok(record)
    }

    async fn find_patient(&self, id: i32) -> Result<Option<Patient>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>> {
        self.check_available()?;
        Ok(self.state.read().await.patients.clone())
    }

    async fn insert_xray(&self, xray: &NewXray) -> Result<Xray> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if !state.patients.iter().any(|p| p.id == xray.patient_id) {
            return Err(XrayError::Database(format!(
                "foreign key violation: patient {} does not exist",
                xray.patient_id
            )));
        }

        let now = Local::now().naive_local();
        let record = Xray {
            id: state.xrays.len() as i32 + 1,
            patient_id: xray.patient_id,
            x_ray_image: xray.x_ray_image.clone(),
            result: xray.result.clone(),
            confidence: xray.confidence,
            created_at: now,
            updated_at: now,
        };
        state.xrays.push(record.clone());
        Ok(record)
    }

    async fn list_xrays_for_patient(&self, patient_id: i32) -> Result<Vec<Xray>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .xrays
            .iter()
            .filter(|x| x.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn list_all_xrays(&self) -> Result<Vec<Xray>> {
        self.check_available()?;
        Ok(self.state.read().await.xrays.clone())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
