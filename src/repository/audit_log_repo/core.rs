use crate::domain::audit::{AuditAction, AuditEntity, AuditEvent};
use crate::domain::types::format_ts;
use crate::repository::collaborators::AuditSink;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// AuditLogRepository - 审计日志仓储
// ==========================================
// 红线: 只追加，不更新不删除
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入审计事件
    ///
    /// # 返回
    /// - `Ok(id)`: 事件 id
    pub fn insert(&self, event: &AuditEvent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, details_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.id,
                event.actor_id,
                event.action,
                event.entity_type,
                event.entity_id,
                event.details.as_ref().map(|v| v.to_string()),
                format_ts(&event.created_at),
            ],
        )?;
        Ok(event.id.clone())
    }
}

impl AuditSink for AuditLogRepository {
    fn record(
        &self,
        actor_id: Option<&str>,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> RepositoryResult<()> {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.map(str::to_string),
            action: action.as_str().to_string(),
            entity_type: entity.as_str().to_string(),
            entity_id: entity_id.map(str::to_string),
            details,
            created_at: Utc::now(),
        };
        self.insert(&event)?;
        Ok(())
    }
}
