// ==========================================
// 线索管理后端 - 权限种子数据工具
// ==========================================
// 用法: seed_access_control [db_path]
// 说明: 建表（幂等）后写入角色、权限与演示用户；可重复执行
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use lead_pipeline::app::get_default_db_path;
use lead_pipeline::app::seed::seed_access_control;
use lead_pipeline::db::{init_schema, open_sqlite_connection};
use lead_pipeline::logging;
use lead_pipeline::repository::UserRepository;

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    let repo = UserRepository::new(Arc::new(Mutex::new(conn)));
    let summary = seed_access_control(&repo)?;

    eprintln!(
        "Seeded {}: {} roles, {} grants, {} new users",
        db_path, summary.roles, summary.grants, summary.users_created
    );
    Ok(())
}
