// ==========================================
// 线索管理后端 - 外部协作方接口
// ==========================================
// 职责: 权限判定 / 用户查询 / 审计写入 的抽象
// 说明: 核心流程只依赖这些 trait；本 crate 提供 SQLite 实现
//       (UserRepository / AuditLogRepository)，测试可替换为内存实现
// ==========================================

use crate::domain::audit::{AuditAction, AuditEntity};
use crate::domain::user::User;
use crate::repository::error::RepositoryResult;
use serde_json::Value as JsonValue;
use tracing::warn;

/// 权限判定
///
/// 权限以 (module, action) 对表示，例如 ("companies", "approve")
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, user_id: &str, module: &str, action: &str) -> RepositoryResult<bool>;
}

/// 用户查询
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, user_id: &str) -> RepositoryResult<Option<User>>;
}

/// 审计写入
///
/// 调用方在业务变更提交后调用；失败只记录告警，不影响业务结果
pub trait AuditSink: Send + Sync {
    fn record(
        &self,
        actor_id: Option<&str>,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> RepositoryResult<()>;

    /// 写入审计；失败只告警
    fn record_or_warn(
        &self,
        actor_id: Option<&str>,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<&str>,
        details: Option<JsonValue>,
    ) {
        if let Err(e) = self.record(actor_id, action, entity, entity_id, details) {
            warn!(
                action = action.as_str(),
                entity_id = entity_id.unwrap_or("-"),
                error = %e,
                "记录审计日志失败"
            );
        }
    }
}
