use super::core::AuditLogRepository;
use crate::domain::audit::AuditEvent;
use crate::domain::types::parse_ts;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Result as SqliteResult, Row};

const AUDIT_COLUMNS: &str =
    "id, actor_id, action, entity_type, entity_id, details_json, created_at";

impl AuditLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<AuditEvent>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM audit_logs WHERE id = ?1", AUDIT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], map_row) {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 某实体的审计轨迹（时间正序）
    pub fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> RepositoryResult<Vec<AuditEvent>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_logs WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY created_at ASC, rowid ASC",
            AUDIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![entity_type, entity_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 某操作人的审计记录（最新在前）
    pub fn find_by_actor(&self, actor_id: &str) -> RepositoryResult<Vec<AuditEvent>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_logs WHERE actor_id = ?1 ORDER BY created_at DESC, rowid DESC",
            AUDIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![actor_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按动作查询（最新在前）
    pub fn find_by_action(&self, action: &str) -> RepositoryResult<Vec<AuditEvent>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_logs WHERE action = ?1 ORDER BY created_at DESC, rowid DESC",
            AUDIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![action], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row) -> SqliteResult<AuditEvent> {
    let details_raw: Option<String> = row.get(5)?;
    let details = match details_raw {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(AuditEvent {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        details,
        created_at: parse_ts(&row.get::<_, String>(6)?),
    })
}
