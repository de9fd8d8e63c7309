// ==========================================
// 线索管理后端 - 应用层
// ==========================================
// 职责: 组件装配与进程入口支撑
// ==========================================

pub mod seed;
pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
