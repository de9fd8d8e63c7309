// ==========================================
// 线索管理后端 - 负责人分配领域模型
// ==========================================
// 对齐: v0.1_init.sql assignments 表
// 红线: 取消分配只置 is_active = 0，不物理删除
// 红线: 同一 (对象类型, 对象, 用户) 最多一条有效分配
// ==========================================

use crate::domain::audit::AuditEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// AssignmentTarget - 可分配对象类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentTarget {
    Segment,
    Company,
    Contact,
}

impl AssignmentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentTarget::Segment => "segment",
            AssignmentTarget::Company => "company",
            AssignmentTarget::Contact => "contact",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "segment" => Some(AssignmentTarget::Segment),
            "company" => Some(AssignmentTarget::Company),
            "contact" => Some(AssignmentTarget::Contact),
            _ => None,
        }
    }

    /// 分配审计记在被分配对象上
    pub fn audit_entity(&self) -> AuditEntity {
        match self {
            AssignmentTarget::Segment => AuditEntity::Segment,
            AssignmentTarget::Company => AuditEntity::Company,
            AssignmentTarget::Contact => AuditEntity::Contact,
        }
    }
}

impl fmt::Display for AssignmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Assignment - 对象负责人
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub target: AssignmentTarget, // 落库为 entity_type
    pub entity_id: String,
    pub assigned_to: String,      // 被分配用户
    pub assigned_by: String,      // 操作人
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 列表过滤条件（全部为空时返回所有有效分配）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub target: Option<AssignmentTarget>,
    pub entity_id: Option<String>,
    pub assigned_to: Option<String>,
}

impl AssignmentFilter {
    pub fn for_entity(target: AssignmentTarget, entity_id: &str) -> Self {
        Self {
            target: Some(target),
            entity_id: Some(entity_id.to_string()),
            assigned_to: None,
        }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            assigned_to: Some(user_id.to_string()),
            ..Default::default()
        }
    }
}
