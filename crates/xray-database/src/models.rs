//! 数据库模型

use chrono::NaiveDateTime;
use sqlx::FromRow;
use xray_core::{Patient, Xray, XrayError};

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: i32,
    pub name: String,
    pub date_of_birth: NaiveDateTime,
    pub gender: String, // 存储为小写字符串，转换为Gender枚举
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<DbPatient> for Patient {
    type Error = XrayError;

    fn try_from(db_patient: DbPatient) -> Result<Self, Self::Error> {
        let gender = db_patient.gender.parse().map_err(|_| {
            XrayError::Database(format!(
                "Invalid gender {:?} stored for patient {}",
                db_patient.gender, db_patient.id
            ))
        })?;

        Ok(Patient {
            id: db_patient.id,
            name: db_patient.name,
            date_of_birth: db_patient.date_of_birth,
            gender,
            created_at: db_patient.created_at,
            updated_at: db_patient.updated_at,
        })
    }
}

/// 数据库X光表
#[derive(Debug, FromRow)]
pub struct DbXray {
    pub id: i32,
    pub patient_id: i32,
    pub x_ray_image: String,
    pub result: String,
    pub confidence: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<DbXray> for Xray {
    fn from(db_xray: DbXray) -> Self {
        Xray {
            id: db_xray.id,
            patient_id: db_xray.patient_id,
            x_ray_image: db_xray.x_ray_image,
            result: db_xray.result,
            confidence: db_xray.confidence,
            created_at: db_xray.created_at,
            updated_at: db_xray.updated_at,
        }
    }
}
