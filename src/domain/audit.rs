// ==========================================
// 线索管理后端 - 审计日志领域模型
// ==========================================
// 对齐: v0.1_init.sql audit_logs 表
// 用途: 状态转换 / 更新 / 上传 / 去重 / 负责人分配的审计追踪
// 说明: actor_id 为 None 表示系统动作（定时去重）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// AuditEvent - 审计事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub actor_id: Option<String>,
    pub action: String,              // AuditAction::as_str()
    pub entity_type: String,         // AuditEntity::as_str()
    pub entity_id: Option<String>,
    pub details: Option<JsonValue>,  // 落库为 details_json
    pub created_at: DateTime<Utc>,
}

// ==========================================
// AuditAction - 审计动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Approve,
    Reject,
    BulkApprove,
    AssignSdr,
    ScheduleMeeting,
    Assign,
    Unassign,
    Deactivate,
    Archive,
    Activate,
    Upload,
    CorrectError,
    DedupCompanies,
    DedupContacts,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Approve => "approve",
            AuditAction::Reject => "reject",
            AuditAction::BulkApprove => "bulk_approve",
            AuditAction::AssignSdr => "assign_sdr",
            AuditAction::ScheduleMeeting => "schedule_meeting",
            AuditAction::Assign => "assign",
            AuditAction::Unassign => "unassign",
            AuditAction::Deactivate => "deactivate",
            AuditAction::Archive => "archive",
            AuditAction::Activate => "activate",
            AuditAction::Upload => "upload",
            AuditAction::CorrectError => "correct_error",
            AuditAction::DedupCompanies => "dedup_companies",
            AuditAction::DedupContacts => "dedup_contacts",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// AuditEntity - 审计对象类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Segment,
    Offering,
    Company,
    Contact,
    UploadBatch,
    UploadError,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Segment => "segment",
            AuditEntity::Offering => "offering",
            AuditEntity::Company => "company",
            AuditEntity::Contact => "contact",
            AuditEntity::UploadBatch => "upload_batch",
            AuditEntity::UploadError => "upload_error",
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// FieldChange - 单字段变更（update 审计明细）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: JsonValue,
    pub new: JsonValue,
}

/// 将字段变更列表折叠为 `{field: {old, new}}`
pub fn changes_to_details(changes: &[FieldChange]) -> JsonValue {
    let mut map = serde_json::Map::new();
    for c in changes {
        map.insert(
            c.field.to_string(),
            serde_json::json!({ "old": c.old, "new": c.new }),
        );
    }
    JsonValue::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changes_to_details() {
        let changes = vec![
            FieldChange { field: "name", old: json!("Acme"), new: json!("Acme Inc") },
            FieldChange { field: "founded_year", old: JsonValue::Null, new: json!(1999) },
        ];
        let details = changes_to_details(&changes);
        assert_eq!(details["name"]["old"], "Acme");
        assert_eq!(details["name"]["new"], "Acme Inc");
        assert_eq!(details["founded_year"]["new"], 1999);
    }
}
