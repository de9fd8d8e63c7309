// ==========================================
// 线索管理后端 - 领域模型层
// ==========================================
// 职责: 定义实体、状态枚举、创建/更新命令
// 红线: 不含数据访问逻辑，不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod audit;
pub mod company;
pub mod contact;
pub mod segment;
pub mod types;
pub mod upload;
pub mod user;

// 重导出核心类型
pub use assignment::{Assignment, AssignmentFilter, AssignmentTarget};
pub use audit::{AuditAction, AuditEntity, AuditEvent, FieldChange};
pub use company::{Company, CompanyUpdate, NewCompany};
pub use contact::{Contact, ContactUpdate, NewContact};
pub use segment::{Offering, Segment};
pub use types::{BatchStatus, CompanyStatus, ContactStatus, EntityType, SegmentStatus};
pub use upload::{BatchResult, EntityDraft, FieldError, UploadBatch, UploadError};
pub use user::User;
