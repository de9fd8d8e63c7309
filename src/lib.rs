// ==========================================
// 线索管理后端 - 核心库
// ==========================================
// 范围: 公司/联系人生命周期、CSV 批量导入、定时去重、审计
// 技术栈: Rust + SQLite + tokio
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - CSV 批量导入
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, CompanyStatus, ContactStatus, EntityType, SegmentStatus};

// 领域实体
pub use domain::{
    Assignment, AssignmentTarget, AuditEvent, BatchResult, Company, Contact, FieldError, Offering,
    Segment, UploadBatch, UploadError, User,
};

// 引擎
pub use engine::{DedupReport, DedupScheduler, DedupSweep, PassOutcome};

// API
pub use api::{
    ApiError, ApiResult, AssignmentApi, CompanyApi, ContactApi, DedupApi, SegmentApi, UploadApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "线索管理后端";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
