// ==========================================
// 线索管理后端 - 用户
// ==========================================
// 用户/角色/权限由外部协作方维护，这里只保留核心需要的只读视图
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
