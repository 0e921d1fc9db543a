//! 核心数据模型定义

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::XrayError;
use crate::utils;

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i32,
    pub name: String,                 // 患者姓名
    pub date_of_birth: NaiveDateTime, // 出生日期
    pub gender: Gender,               // 性别
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Patient {
    /// 按年份差计算年龄，不考虑月和日
    pub fn age(&self) -> i32 {
        utils::age_in_years(self.date_of_birth, Local::now().naive_local())
    }
}

/// 性别枚举
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// 数据库中的存储形式
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = XrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(XrayError::Validation(format!("Unknown gender: {}", other))),
        }
    }
}

/// X光影像及其分析结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Xray {
    pub id: i32,
    pub patient_id: i32,
    pub x_ray_image: String, // 本地路径或公开URL
    pub result: String,
    pub confidence: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 创建患者请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    #[serde(deserialize_with = "utils::deserialize_birth_date")]
    pub date_of_birth: NaiveDateTime,
    pub gender: Gender,
}

/// 新X光记录插入模型
#[derive(Debug, Clone)]
pub struct NewXray {
    pub patient_id: i32,
    pub x_ray_image: String,
    pub result: String,
    pub confidence: f64,
}

/// 影像分析输出
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub result: String,
    pub confidence: f64,
}

/// 患者详情（含年龄和X光列表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub id: i32,
    pub name: String,
    pub date_of_birth: NaiveDateTime,
    pub gender: Gender,
    pub age: i32,
    pub created_at: NaiveDateTime,
    pub xrays: Vec<Xray>,
}

impl PatientDetail {
    pub fn new(patient: Patient, xrays: Vec<Xray>) -> Self {
        let age = patient.age();
        Self {
            id: patient.id,
            name: patient.name,
            date_of_birth: patient.date_of_birth,
            gender: patient.gender,
            age,
            created_at: patient.created_at,
            xrays,
        }
    }
}

/// 上传的单个文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// 单个文件的上传结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedXray {
    pub id: i32,
    pub filename: String,
    pub result: String,
    pub confidence: f64,
}

/// 批量上传汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub patient_id: i32,
    pub uploaded_count: usize,
    pub results: Vec<UploadedXray>,
}
