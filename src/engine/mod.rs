// ==========================================
// 线索管理后端 - 引擎层
// ==========================================
// 职责: 规范化、状态机规则、去重扫描编排、定时调度
// 红线: Engine 不拼 SQL
// ==========================================

pub mod dedup;
pub mod lifecycle;
pub mod normalizer;
pub mod scheduler;

// 重导出核心引擎
pub use dedup::{DedupReport, DedupSweep, PassOutcome};
pub use lifecycle::LifecycleError;
pub use scheduler::{DedupRunner, DedupScheduler, SchedulerError};
