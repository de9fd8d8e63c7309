// ==========================================
// 线索管理后端 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 前三类为快速失败（不创建批次）；行级问题不走错误类型，
//       以 FieldError 形式记录到 upload_errors
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 快速失败 =====
    #[error("文件编码无效: 仅支持 UTF-8")]
    InvalidEncoding,

    #[error("文件过大: {size} 字节，上限 {limit} 字节")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("缺少必填列: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    // ===== 解析错误 =====
    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 存储错误 =====
    #[error("导入落库失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("后台任务失败: {0}")]
    TaskJoin(String),
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
