//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use xray_core::{NewPatient, NewXray, Patient, Result, Xray};

const PATIENT_COLUMNS: &str = "id, name, date_of_birth, gender, created_at, updated_at";
const XRAY_COLUMNS: &str =
    "id, patient_id, x_ray_image, result, confidence, created_at, updated_at";

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表（幂等）
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建患者表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patient (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                date_of_birth TIMESTAMP NOT NULL,
                gender VARCHAR(10) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP NOT NULL DEFAULT NOW()
            )
        "#,
        )
        .execute(pool)
        .await?;

        // 创建X光表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS xray (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER NOT NULL REFERENCES patient(id),
                x_ray_image VARCHAR(1024) NOT NULL,
                result VARCHAR(255) NOT NULL,
                confidence DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP NOT NULL DEFAULT NOW()
            )
        "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_xray_patient_id ON xray(patient_id)")
            .execute(pool)
            .await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        let pool = self.pool.pool();

        let row = sqlx::query_as::<_, DbPatient>(&format!(
            r#"
            INSERT INTO patient (name, date_of_birth, gender)
            VALUES ($1, $2, $3)
            RETURNING {}
        "#,
            PATIENT_COLUMNS
        ))
        .bind(&patient.name)
        .bind(patient.date_of_birth)
        .bind(patient.gender.as_str())
        .fetch_one(pool)
        .await?;

        Patient::try_from(row)
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: i32) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(&format!(
            "SELECT {} FROM patient WHERE id = $1",
            PATIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        result.map(Patient::try_from).transpose()
    }

    /// 获取所有患者，按插入顺序
    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(&format!(
            "SELECT {} FROM patient ORDER BY id",
            PATIENT_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        results.into_iter().map(Patient::try_from).collect()
    }

    // ========== X光相关操作 ==========

    /// 写入一条X光结果
    pub async fn create_xray(&self, xray: &NewXray) -> Result<Xray> {
        let pool = self.pool.pool();

        let row = sqlx::query_as::<_, DbXray>(&format!(
            r#"
            INSERT INTO xray (patient_id, x_ray_image, result, confidence)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
        "#,
            XRAY_COLUMNS
        ))
        .bind(xray.patient_id)
        .bind(&xray.x_ray_image)
        .bind(&xray.result)
        .bind(xray.confidence)
        .fetch_one(pool)
        .await?;

        Ok(Xray::from(row))
    }

    /// 根据患者ID获取所有X光
    pub async fn get_xrays_by_patient_id(&self, patient_id: i32) -> Result<Vec<Xray>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbXray>(&format!(
            "SELECT {} FROM xray WHERE patient_id = $1 ORDER BY id",
            XRAY_COLUMNS
        ))
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        Ok(results.into_iter().map(Xray::from).collect())
    }

    /// 获取全部X光，用于患者列表的批量装配
    pub async fn list_xrays(&self) -> Result<Vec<Xray>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbXray>(&format!(
            "SELECT {} FROM xray ORDER BY patient_id, id",
            XRAY_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(results.into_iter().map(Xray::from).collect())
    }
}
