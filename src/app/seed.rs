// ==========================================
// 线索管理后端 - 权限种子数据
// ==========================================
// 职责: 角色 / 权限 / 演示用户初始化（可重复执行）
// ==========================================

use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::User;
use crate::repository::{RepositoryResult, UserRepository};

/// 角色 → 权限 ("module:action")
pub const ROLE_PERMISSIONS: &[(&str, &[&str])] = &[
    (
        "Admin",
        &[
            "segments:read",
            "companies:read",
            "contacts:read",
            "uploads:read",
            "dedup:run",
            "assignments:create",
            "assignments:delete",
            "assignments:read",
        ],
    ),
    (
        "Segment Owner",
        &[
            "segments:create",
            "segments:archive",
            "segments:read",
            "companies:read",
            "contacts:read",
            "assignments:create",
            "assignments:delete",
            "assignments:read",
        ],
    ),
    (
        "Researcher",
        &[
            "segments:read",
            "companies:create",
            "companies:read",
            "companies:edit",
            "companies:upload_csv",
            "contacts:create",
            "contacts:read",
            "contacts:edit",
            "contacts:upload_csv",
            "uploads:read",
            "assignments:read",
        ],
    ),
    (
        "Approver",
        &[
            "segments:read",
            "companies:create",
            "companies:read",
            "companies:edit",
            "companies:approve",
            "companies:reject",
            "companies:upload_csv",
            "contacts:create",
            "contacts:read",
            "contacts:edit",
            "contacts:approve",
            "contacts:assign",
            "contacts:upload_csv",
            "uploads:read",
            "assignments:create",
            "assignments:delete",
            "assignments:read",
        ],
    ),
    (
        "SDR",
        &[
            "segments:read",
            "companies:read",
            "contacts:read",
            "companies:approve",
            "companies:reject",
            "contacts:approve",
            "contacts:schedule_meeting",
            "assignments:read",
        ],
    ),
    ("Marketing", &["segments:read"]),
];

/// 演示用户 (email, name, role)
pub const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("admin@leads.local", "Admin User", "Admin"),
    ("owner@leads.local", "Segment Owner", "Segment Owner"),
    ("researcher@leads.local", "Jane Researcher", "Researcher"),
    ("approver@leads.local", "Bob Approver", "Approver"),
    ("sdr@leads.local", "Alice SDR", "SDR"),
    ("marketing@leads.local", "Maria Marketing", "Marketing"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub roles: usize,
    pub grants: usize,
    pub users_created: usize,
}

/// 写入角色与权限授予
pub fn seed_roles(repo: &UserRepository) -> RepositoryResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    for (role, perms) in ROLE_PERMISSIONS {
        let role_id = repo.ensure_role(role, None)?;
        summary.roles += 1;
        for perm in perms.iter() {
            let Some((module, action)) = perm.split_once(':') else {
                continue;
            };
            let perm_id = repo.ensure_permission(module, action, None)?;
            repo.grant_permission(role_id, perm_id)?;
            summary.grants += 1;
        }
    }
    Ok(summary)
}

/// 创建用户（已存在则复用）并授予角色，返回用户 id
pub fn ensure_user_with_role(
    repo: &UserRepository,
    email: &str,
    name: &str,
    role: &str,
) -> RepositoryResult<(String, bool)> {
    let (user_id, created) = match repo.find_by_email(email)? {
        Some(existing) => (existing.id, false),
        None => {
            let user = User {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                name: name.to_string(),
                is_active: true,
                created_at: Utc::now(),
            };
            repo.insert_user(&user)?;
            (user.id, true)
        }
    };
    let role_id = repo.ensure_role(role, None)?;
    repo.assign_role(&user_id, role_id)?;
    Ok((user_id, created))
}

/// 角色 + 演示用户
pub fn seed_access_control(repo: &UserRepository) -> RepositoryResult<SeedSummary> {
    let mut summary = seed_roles(repo)?;
    for (email, name, role) in DEMO_USERS {
        let (_, created) = ensure_user_with_role(repo, email, name, role)?;
        if created {
            summary.users_created += 1;
        }
    }
    tracing::info!(
        roles = summary.roles,
        grants = summary.grants,
        users_created = summary.users_created,
        "权限种子数据写入完成"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::repository::PermissionChecker;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn repo() -> UserRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        UserRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_seed_is_idempotent_and_grants_roles() {
        let repo = repo();
        let first = seed_access_control(&repo).unwrap();
        assert_eq!(first.users_created, DEMO_USERS.len());

        let second = seed_access_control(&repo).unwrap();
        assert_eq!(second.users_created, 0);

        let approver = repo.find_by_email("approver@leads.local").unwrap().unwrap();
        assert!(repo.has_permission(&approver.id, "companies", "approve").unwrap());
        assert!(!repo.has_permission(&approver.id, "dedup", "run").unwrap());
        assert!(repo.has_permission(&approver.id, "assignments", "create").unwrap());

        let researcher = repo.find_by_email("researcher@leads.local").unwrap().unwrap();
        assert!(!repo.has_permission(&researcher.id, "companies", "approve").unwrap());
        assert_eq!(repo.role_names(&researcher.id).unwrap(), vec!["Researcher".to_string()]);
        assert!(!repo.has_permission(&researcher.id, "assignments", "create").unwrap());
    }
}
