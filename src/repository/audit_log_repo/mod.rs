// ==========================================
// 线索管理后端 - 审计日志数据仓储
// ==========================================
// 对齐: v0.1_init.sql audit_logs 表
// 说明: 实现 AuditSink，供 API 层在业务变更提交后写入
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::AuditLogRepository;
