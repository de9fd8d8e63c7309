// ==========================================
// 线索管理后端 - 细分 / 产品线领域模型
// ==========================================
// 对齐: v0.1_init.sql segments / offerings / segment_offerings 表
// 红线: 细分只归档不删除；与产品线的关系只经由关联表读取
// ==========================================

use crate::domain::types::SegmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Segment - 细分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,                  // UUID
    pub name: String,                // 唯一名称
    pub description: Option<String>, // 说明
    pub status: SegmentStatus,       // active / archived
    pub created_by: String,          // 负责人
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    pub fn is_active(&self) -> bool {
        self.status == SegmentStatus::Active
    }
}

// ==========================================
// Offering - 产品线
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: SegmentStatus,
    pub created_at: DateTime<Utc>,
}
