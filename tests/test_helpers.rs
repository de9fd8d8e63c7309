// ==========================================
// 测试辅助函数
// ==========================================
// 临时库 + AppState 装配 + 角色化用户
// ==========================================

#![allow(dead_code)]

use lead_pipeline::app::seed::{ensure_user_with_role, seed_roles};
use lead_pipeline::app::AppState;
use lead_pipeline::db::{init_schema, open_sqlite_connection};
use lead_pipeline::domain::types::format_ts;
use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建测试数据库并返回临时文件与路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试库连接（与被测代码使用同样的 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 测试用户（每个角色一个）
pub struct TestUsers {
    pub admin: String,
    pub owner: String,
    pub researcher: String,
    pub approver: String,
    pub sdr: String,
    pub marketing: String,
}

/// 测试环境：临时文件需与 state 同生命周期
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
    pub users: TestUsers,
}

/// 建库 + 装配 AppState + 写入角色与用户
pub fn setup_env() -> TestEnv {
    lead_pipeline::logging::init_test();
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state = AppState::new(db_path.clone()).expect("AppState 初始化失败");

    let repo = state.user_repo.as_ref();
    seed_roles(repo).expect("写入角色失败");
    let user = |email: &str, role: &str| {
        ensure_user_with_role(repo, email, role, role)
            .expect("创建用户失败")
            .0
    };
    let users = TestUsers {
        admin: user("admin@test.local", "Admin"),
        owner: user("owner@test.local", "Segment Owner"),
        researcher: user("researcher@test.local", "Researcher"),
        approver: user("approver@test.local", "Approver"),
        sdr: user("sdr@test.local", "SDR"),
        marketing: user("marketing@test.local", "Marketing"),
    };

    TestEnv {
        _temp_file: temp_file,
        db_path,
        state,
        users,
    }
}

/// 直接改写 created_at（模拟先后创建）
pub fn set_created_at(
    db_path: &str,
    table: &str,
    id: &str,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), Box<dyn Error>> {
    let conn = open_test_connection(db_path)?;
    let sql = format!("UPDATE {} SET created_at = ?1 WHERE id = ?2", table);
    conn.execute(&sql, params![format_ts(&created_at), id])?;
    Ok(())
}

/// 统计表行数
pub fn count_rows(db_path: &str, table: &str) -> Result<i64, Box<dyn Error>> {
    let conn = open_test_connection(db_path)?;
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
