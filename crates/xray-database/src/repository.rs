//! 仓储接口
//!
//! 业务层只依赖这个trait，PostgreSQL和内存实现可以互换。

use async_trait::async_trait;
use xray_core::{NewPatient, NewXray, Patient, Result, Xray};

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;

/// 患者与X光记录的持久化能力
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// 写入患者并返回带生成ID和时间戳的记录
    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient>;

    async fn find_patient(&self, id: i32) -> Result<Option<Patient>>;

    async fn list_patients(&self) -> Result<Vec<Patient>>;

    /// 写入后立即提交，不参与批次事务
    async fn insert_xray(&self, xray: &NewXray) -> Result<Xray>;

    async fn list_xrays_for_patient(&self, patient_id: i32) -> Result<Vec<Xray>>;

    async fn list_all_xrays(&self) -> Result<Vec<Xray>>;

    /// 连通性检查
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl PatientRepository for DatabasePool {
    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        DatabaseQueries::new(self).create_patient(patient).await
    }

    async fn find_patient(&self, id: i32) -> Result<Option<Patient>> {
        DatabaseQueries::new(self).get_patient_by_id(id).await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>> {
        DatabaseQueries::new(self).list_patients().await
    }

    async fn insert_xray(&self, xray: &NewXray) -> Result<Xray> {
        DatabaseQueries::new(self).create_xray(xray).await
    }

    async fn list_xrays_for_patient(&self, patient_id: i32) -> Result<Vec<Xray>> {
        DatabaseQueries::new(self)
            .get_xrays_by_patient_id(patient_id)
            .await
    }

    async fn list_all_xrays(&self) -> Result<Vec<Xray>> {
        DatabaseQueries::new(self).list_xrays().await
    }

    async fn ping(&self) -> Result<()> {
        DatabasePool::ping(self).await
    }
}
