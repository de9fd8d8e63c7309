// ==========================================
// 线索管理后端 - 权限守卫与审计
// ==========================================
// 职责: 每个操作先做权限判定；业务变更提交后再写审计
// 红线: 权限判定先于任何读写
// ==========================================

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::audit::{AuditAction, AuditEntity};
use crate::repository::collaborators::{AuditSink, PermissionChecker};

/// 权限 (module, action) 常量
pub mod perms {
    pub const SEGMENTS: &str = "segments";
    pub const COMPANIES: &str = "companies";
    pub const CONTACTS: &str = "contacts";
    pub const UPLOADS: &str = "uploads";
    pub const DEDUP: &str = "dedup";
    pub const ASSIGNMENTS: &str = "assignments";

    pub const CREATE: &str = "create";
    pub const ARCHIVE: &str = "archive";
    pub const EDIT: &str = "edit";
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const ASSIGN: &str = "assign";
    pub const SCHEDULE_MEETING: &str = "schedule_meeting";
    pub const UPLOAD_CSV: &str = "upload_csv";
    pub const READ: &str = "read";
    pub const RUN: &str = "run";
    pub const DELETE: &str = "delete";
}

// ==========================================
// AccessGuard
// ==========================================
pub struct AccessGuard {
    permissions: Arc<dyn PermissionChecker>,
    audit: Arc<dyn AuditSink>,
}

impl AccessGuard {
    pub fn new(permissions: Arc<dyn PermissionChecker>, audit: Arc<dyn AuditSink>) -> Self {
        Self { permissions, audit }
    }

    /// 权限判定；不具备时返回 PermissionDenied
    pub fn require(&self, actor_id: &str, module: &str, action: &str) -> ApiResult<()> {
        if self.permissions.has_permission(actor_id, module, action)? {
            Ok(())
        } else {
            debug!(actor_id, module, action, "权限不足");
            Err(ApiError::PermissionDenied {
                module: module.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// 写审计（失败只告警）
    pub fn audit(
        &self,
        actor_id: Option<&str>,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<&str>,
        details: Option<JsonValue>,
    ) {
        self.audit
            .record_or_warn(actor_id, action, entity, entity_id, details);
    }
}
