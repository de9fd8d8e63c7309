// ==========================================
// 线索管理后端 - 用户 / 角色 / 权限数据仓储
// ==========================================
// 对齐: users / roles / permissions / user_roles / role_permissions 表
// 说明: 实现 UserDirectory 与 PermissionChecker；多对多关系只经由关联表读取
// ==========================================

use crate::domain::types::{format_ts, parse_ts};
use crate::domain::user::User;
use crate::repository::collaborators::{PermissionChecker, UserDirectory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 用户
    // ==========================================

    pub fn insert_user(&self, user: &User) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO users (id, email, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.email,
                user.name,
                user.is_active,
                format_ts(&user.created_at)
            ],
        )?;
        Ok(())
    }

    pub fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, name, is_active, created_at FROM users WHERE email = ?1",
        )?;

        match stmt.query_row(params![email], map_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_active(&self, user_id: &str, active: bool) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![active, user_id],
        )?;
        Ok(rows > 0)
    }

    // ==========================================
    // 角色 / 权限
    // ==========================================

    /// 确保角色存在，返回角色 id
    pub fn ensure_role(&self, name: &str, description: Option<&str>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO roles (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        let id = conn.query_row(
            "SELECT id FROM roles WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// 确保权限存在，返回权限 id
    pub fn ensure_permission(
        &self,
        module: &str,
        action: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO permissions (module, action, description) VALUES (?1, ?2, ?3)",
            params![module, action, description],
        )?;
        let id = conn.query_row(
            "SELECT id FROM permissions WHERE module = ?1 AND action = ?2",
            params![module, action],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn grant_permission(&self, role_id: i64, permission_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
            params![role_id, permission_id],
        )?;
        Ok(())
    }

    pub fn assign_role(&self, user_id: &str, role_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id, role_id],
        )?;
        Ok(())
    }

    /// 用户持有的角色名
    pub fn role_names(&self, user_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?1
            ORDER BY r.name ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(rows)
    }
}

impl UserDirectory for UserRepository {
    fn find_user(&self, user_id: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, name, is_active, created_at FROM users WHERE id = ?1",
        )?;

        match stmt.query_row(params![user_id], map_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl PermissionChecker for UserRepository {
    /// 停用用户一律无权限
    fn has_permission(&self, user_id: &str, module: &str, action: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let hit: Option<i64> = conn
            .query_row(
                r#"
                SELECT 1
                FROM users u
                JOIN user_roles ur ON ur.user_id = u.id
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE u.id = ?1 AND u.is_active = 1 AND p.module = ?2 AND p.action = ?3
                LIMIT 1
                "#,
                params![user_id, module, action],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }
}

fn map_user(row: &Row) -> SqliteResult<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get(3)?,
        created_at: parse_ts(&row.get::<_, String>(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use chrono::Utc;

    fn setup() -> UserRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        UserRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_permission_via_role() {
        let repo = setup();
        repo.insert_user(&user("alice")).unwrap();
        repo.insert_user(&user("bob")).unwrap();

        let approver = repo.ensure_role("Approver", None).unwrap();
        assert_eq!(repo.ensure_role("Approver", None).unwrap(), approver);
        let perm = repo.ensure_permission("companies", "approve", None).unwrap();
        repo.grant_permission(approver, perm).unwrap();
        repo.assign_role("alice", approver).unwrap();

        assert!(repo.has_permission("alice", "companies", "approve").unwrap());
        assert!(!repo.has_permission("alice", "companies", "reject").unwrap());
        assert!(!repo.has_permission("bob", "companies", "approve").unwrap());
        assert_eq!(repo.role_names("alice").unwrap(), vec!["Approver".to_string()]);
    }

    #[test]
    fn test_inactive_user_has_no_permissions() {
        let repo = setup();
        repo.insert_user(&user("carol")).unwrap();
        let role = repo.ensure_role("Admin", None).unwrap();
        let perm = repo.ensure_permission("dedup", "run", None).unwrap();
        repo.grant_permission(role, perm).unwrap();
        repo.assign_role("carol", role).unwrap();
        assert!(repo.has_permission("carol", "dedup", "run").unwrap());

        repo.set_active("carol", false).unwrap();
        assert!(!repo.has_permission("carol", "dedup", "run").unwrap());
        assert!(!repo.find_user("carol").unwrap().unwrap().is_active);
        assert!(repo.find_user("nobody").unwrap().is_none());
    }
}
