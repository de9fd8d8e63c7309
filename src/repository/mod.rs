// ==========================================
// 线索管理后端 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod assignment_repo;
pub mod audit_log_repo;
pub mod collaborators;
pub mod company_repo;
pub mod contact_repo;
pub mod dedup_repo;
pub mod error;
pub mod segment_repo;
pub mod upload_repo;
pub mod user_repo;

// 重导出核心仓储
pub use assignment_repo::AssignmentRepository;
pub use audit_log_repo::AuditLogRepository;
pub use collaborators::{AuditSink, PermissionChecker, UserDirectory};
pub use company_repo::CompanyRepository;
pub use contact_repo::ContactRepository;
pub use dedup_repo::DedupRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use segment_repo::SegmentRepository;
pub use upload_repo::UploadRepository;
pub use user_repo::UserRepository;

/// 将落库的枚举字符串解码为枚举值（非法值转为列类型转换错误）
pub(crate) fn decode_enum<T>(
    idx: usize,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("非法枚举值: {}", raw).into(),
        )
    })
}
