// ==========================================
// 线索管理后端 - API 层错误类型
// ==========================================
// 职责: 汇总仓储 / 导入 / 规则错误，转换为调用方可理解的错误
// 说明: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::lifecycle::LifecycleError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 授权 =====
    #[error("权限不足: {module}:{action}")]
    PermissionDenied { module: String, action: String },

    // ===== 业务规则错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("资源冲突: {0}")]
    Conflict(String),

    // ===== 导入 =====
    #[error("文件被拒绝: {0}")]
    ImportRejected(ImportError),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Other(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(repo_err) => repo_err.into(),
            ImportError::TaskJoin(msg) => ApiError::InternalError(msg),
            rejected => ApiError::ImportRejected(rejected),
        }
    }
}

// ==========================================
// 从 LifecycleError 转换
// ==========================================
impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            field_err => ApiError::InvalidInput(field_err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_api_taxonomy() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation("segments.name".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = RepositoryError::NotFound {
            entity: "Company".into(),
            id: "c1".into(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("c1")));
    }

    #[test]
    fn test_fast_fail_import_errors_are_rejections() {
        let err: ApiError = ImportError::MissingColumns(vec!["Email".into()]).into();
        assert!(matches!(err, ApiError::ImportRejected(ImportError::MissingColumns(_))));

        let err: ApiError = ImportError::Repository(RepositoryError::LockError("poisoned".into())).into();
        assert!(matches!(err, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_lifecycle_errors() {
        let err: ApiError = LifecycleError::InvalidTransition {
            from: "approved".into(),
            to: "rejected".into(),
        }
        .into();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

        let err: ApiError = LifecycleError::Required { field: "name" }.into();
        assert!(matches!(err, ApiError::InvalidInput(ref m) if m == "name: Required"));
    }
}
