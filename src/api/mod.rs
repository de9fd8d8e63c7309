// ==========================================
// 线索管理后端 - API 层
// ==========================================
// 职责: 权限判定 → 规则校验 → 仓储写入 → 审计
// 说明: 外部路由/序列化层直接调用这些 Api 结构体
// ==========================================

pub mod assignment_api;
pub mod company_api;
pub mod contact_api;
pub mod dedup_api;
pub mod error;
pub mod guard;
pub mod segment_api;
pub mod upload_api;

// 重导出核心类型
pub use assignment_api::AssignmentApi;
pub use company_api::CompanyApi;
pub use contact_api::{BulkApproveResult, ContactApi};
pub use dedup_api::DedupApi;
pub use error::{ApiError, ApiResult};
pub use guard::{perms, AccessGuard};
pub use segment_api::SegmentApi;
pub use upload_api::UploadApi;
