// ==========================================
// 线索管理后端 - 上传批次领域模型
// ==========================================
// 对齐: v0.1_init.sql upload_batches / upload_errors 表
// 红线: 批次完成后 total_rows = valid_rows + invalid_rows
// 红线: 错误记录除 is_corrected 外不可修改
// ==========================================

use crate::domain::company::Company;
use crate::domain::contact::Contact;
use crate::domain::types::{BatchStatus, EntityType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 表头所在行号；首个数据行为 2
pub const HEADER_ROW_NUMBER: i64 = 1;

/// 整行级错误（CSV 记录本身损坏）使用的列名
pub const ROW_LEVEL_COLUMN: &str = "Row";

// ==========================================
// UploadBatch - 上传批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub id: String,
    pub entity_type: EntityType,
    pub file_name: String,
    pub file_size_bytes: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub status: BatchStatus,
    pub uploader_id: String,
    pub created_at: DateTime<Utc>,
}

impl UploadBatch {
    /// 新建处理中批次（计数全为 0）
    pub fn start(
        entity_type: EntityType,
        file_name: &str,
        file_size_bytes: i64,
        uploader_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_type,
            file_name: file_name.to_string(),
            file_size_bytes,
            total_rows: 0,
            valid_rows: 0,
            invalid_rows: 0,
            status: BatchStatus::Processing,
            uploader_id: uploader_id.to_string(),
            created_at: now,
        }
    }

    pub fn summary(&self) -> BatchResult {
        BatchResult {
            id: self.id.clone(),
            entity_type: self.entity_type,
            total_rows: self.total_rows,
            valid_rows: self.valid_rows,
            invalid_rows: self.invalid_rows,
            status: self.status,
        }
    }
}

// ==========================================
// BatchResult - 批次摘要（对外返回）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: String,
    pub entity_type: EntityType,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub status: BatchStatus,
}

// ==========================================
// FieldError - 单字段校验错误（校验器输出）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub row_number: i64,
    pub column_name: String,
    pub value: Option<String>, // 原始值（缺失列为 None）
    pub message: String,
}

impl FieldError {
    pub fn new(row_number: i64, column_name: &str, value: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row_number,
            column_name: column_name.to_string(),
            value: value.map(str::to_string),
            message: message.into(),
        }
    }

    /// 转为待落库的错误记录
    pub fn into_record(self, batch_id: &str, now: DateTime<Utc>) -> UploadError {
        UploadError {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            row_number: self.row_number,
            column_name: self.column_name,
            value: self.value,
            error_message: self.message,
            is_corrected: false,
            created_at: now,
        }
    }
}

// ==========================================
// UploadError - 错误记录（落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadError {
    pub id: String,
    pub batch_id: String,
    pub row_number: i64,
    pub column_name: String,
    pub value: Option<String>,
    pub error_message: String,
    pub is_corrected: bool,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// EntityDraft - 校验通过、尚未落库的实体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntityDraft {
    Company(Company),
    Contact(Contact),
}

impl EntityDraft {
    pub fn id(&self) -> &str {
        match self {
            EntityDraft::Company(c) => &c.id,
            EntityDraft::Contact(c) => &c.id,
        }
    }
}
