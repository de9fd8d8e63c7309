// ==========================================
// 线索管理后端 - 导入层
// ==========================================
// 职责: CSV 批量导入（公司 / 联系人），逐行校验并记录行级错误
// 流程: file_parser → row_validator → batch_importer
// ==========================================

pub mod batch_importer;
pub mod error;
pub mod file_parser;
pub mod row_validator;

// 重导出核心类型
pub use batch_importer::{BatchImporter, CsvBatchImporter, UploadFile};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, CsvRecord, RawRow};
pub use row_validator::{DraftContext, ReferenceLookup, RepositoryReferenceLookup, RowValidator};
