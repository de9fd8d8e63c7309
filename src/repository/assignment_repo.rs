// ==========================================
// 线索管理后端 - 负责人分配数据仓储
// ==========================================
// 对齐: assignments 表
// 红线: Repository 不做业务逻辑，只做数据映射
// 说明: 有效分配的唯一性由部分唯一索引兜底
// ==========================================

use crate::domain::assignment::{Assignment, AssignmentFilter, AssignmentTarget};
use crate::domain::types::{format_ts, parse_ts};
use crate::repository::decode_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str =
    "id, entity_type, entity_id, assigned_to, assigned_by, is_active, created_at, updated_at";

pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入分配
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 同一对象已有该用户的有效分配
    pub fn insert(&self, assignment: &Assignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO assignments (
                id, entity_type, entity_id, assigned_to, assigned_by,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                assignment.id,
                assignment.target.as_str(),
                assignment.entity_id,
                assignment.assigned_to,
                assignment.assigned_by,
                assignment.is_active,
                format_ts(&assignment.created_at),
                format_ts(&assignment.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM assignments WHERE id = ?1", ASSIGNMENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], map_assignment) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查找 (对象, 用户) 的有效分配
    pub fn find_active(
        &self,
        target: AssignmentTarget,
        entity_id: &str,
        assigned_to: &str,
    ) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM assignments \
             WHERE entity_type = ?1 AND entity_id = ?2 AND assigned_to = ?3 AND is_active = 1",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![target.as_str(), entity_id, assigned_to], map_assignment) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按条件列出有效分配（按创建时间升序）
    pub fn list_active(&self, filter: &AssignmentFilter) -> RepositoryResult<Vec<Assignment>> {
        let mut conditions = vec!["is_active = 1".to_string()];
        let mut values: Vec<String> = Vec::new();

        if let Some(target) = filter.target {
            values.push(target.as_str().to_string());
            conditions.push(format!("entity_type = ?{}", values.len()));
        }
        if let Some(entity_id) = &filter.entity_id {
            values.push(entity_id.clone());
            conditions.push(format!("entity_id = ?{}", values.len()));
        }
        if let Some(assigned_to) = &filter.assigned_to {
            values.push(assigned_to.clone());
            conditions.push(format!("assigned_to = ?{}", values.len()));
        }

        let sql = format!(
            "SELECT {} FROM assignments WHERE {} ORDER BY created_at ASC, id ASC",
            ASSIGNMENT_COLUMNS,
            conditions.join(" AND ")
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_assignment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 取消分配（守卫式 UPDATE）
    ///
    /// # 返回
    /// - `Ok(true)`: 本次置为无效
    /// - `Ok(false)`: 已无效或记录不存在
    pub fn deactivate(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE assignments SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![format_ts(&now), id],
        )?;
        Ok(rows > 0)
    }
}

fn map_assignment(row: &Row) -> SqliteResult<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        target: decode_enum(1, row.get(1)?, AssignmentTarget::from_db_str)?,
        entity_id: row.get(2)?,
        assigned_to: row.get(3)?,
        assigned_by: row.get(4)?,
        is_active: row.get(5)?,
        created_at: parse_ts(&row.get::<_, String>(6)?),
        updated_at: parse_ts(&row.get::<_, String>(7)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use chrono::Duration;
    use uuid::Uuid;

    fn setup() -> AssignmentRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO users (id, email, name, is_active, created_at) VALUES
                ('owner', 'o@x.io', 'Owner', 1, '2026-01-01T00:00:00.000000Z'),
                ('r1', 'r1@x.io', 'Researcher One', 1, '2026-01-01T00:00:00.000000Z'),
                ('r2', 'r2@x.io', 'Researcher Two', 1, '2026-01-01T00:00:00.000000Z');
            "#,
        )
        .unwrap();
        AssignmentRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn assignment(target: AssignmentTarget, entity_id: &str, user: &str) -> Assignment {
        let now = Utc::now();
        Assignment {
            id: Uuid::new_v4().to_string(),
            target,
            entity_id: entity_id.to_string(),
            assigned_to: user.to_string(),
            assigned_by: "owner".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_one_active_assignment_per_user_and_entity() {
        let repo = setup();
        let first = assignment(AssignmentTarget::Segment, "s1", "r1");
        repo.insert(&first).unwrap();

        let err = repo
            .insert(&assignment(AssignmentTarget::Segment, "s1", "r1"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        // 其他用户 / 其他对象类型不冲突
        repo.insert(&assignment(AssignmentTarget::Segment, "s1", "r2")).unwrap();
        repo.insert(&assignment(AssignmentTarget::Company, "s1", "r1")).unwrap();

        // 取消后可以重新分配
        assert!(repo.deactivate(&first.id, Utc::now()).unwrap());
        assert!(!repo.deactivate(&first.id, Utc::now()).unwrap());
        assert!(repo
            .find_active(AssignmentTarget::Segment, "s1", "r1")
            .unwrap()
            .is_none());
        repo.insert(&assignment(AssignmentTarget::Segment, "s1", "r1")).unwrap();

        let stored = repo.find_by_id(&first.id).unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[test]
    fn test_list_active_applies_filters() {
        let repo = setup();
        let mut a = assignment(AssignmentTarget::Segment, "s1", "r1");
        a.created_at = Utc::now() - Duration::minutes(5);
        repo.insert(&a).unwrap();
        repo.insert(&assignment(AssignmentTarget::Segment, "s2", "r1")).unwrap();
        repo.insert(&assignment(AssignmentTarget::Company, "c1", "r2")).unwrap();
        let gone = assignment(AssignmentTarget::Contact, "k1", "r1");
        repo.insert(&gone).unwrap();
        repo.deactivate(&gone.id, Utc::now()).unwrap();

        assert_eq!(repo.list_active(&AssignmentFilter::default()).unwrap().len(), 3);

        let mine = repo.list_active(&AssignmentFilter::for_user("r1")).unwrap();
        let ids: Vec<_> = mine.iter().map(|a| a.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let on_s1 = repo
            .list_active(&AssignmentFilter::for_entity(AssignmentTarget::Segment, "s1"))
            .unwrap();
        assert_eq!(on_s1.len(), 1);
        assert_eq!(on_s1[0].assigned_to, "r1");

        let companies_for_r1 = repo
            .list_active(&AssignmentFilter {
                target: Some(AssignmentTarget::Company),
                assigned_to: Some("r1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(companies_for_r1.is_empty());
    }
}
