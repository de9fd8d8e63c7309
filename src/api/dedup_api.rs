// ==========================================
// 线索管理后端 - 去重 API
// ==========================================
// 职责: 运维手动触发去重扫描；定时调度复用同一扫描入口
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::ApiResult;
use crate::api::guard::{perms, AccessGuard};
use crate::engine::dedup::{DedupReport, DedupSweep};
use crate::engine::scheduler::DedupRunner;

pub struct DedupApi {
    sweep: Arc<DedupSweep>,
    guard: Arc<AccessGuard>,
}

impl DedupApi {
    pub fn new(sweep: Arc<DedupSweep>, guard: Arc<AccessGuard>) -> Self {
        Self { sweep, guard }
    }

    /// 立即执行一次扫描（需要 dedup:run 权限）
    pub fn run_now(&self, actor_id: &str) -> ApiResult<DedupReport> {
        self.guard.require(actor_id, perms::DEDUP, perms::RUN)?;
        info!(actor_id, "手动触发去重扫描");
        Ok(self.sweep.run(Some(actor_id)))
    }
}

impl DedupRunner for DedupApi {
    /// 定时触发（系统身份，审计 actor 为空）
    fn run_scheduled(&self) -> DedupReport {
        info!("定时触发去重扫描");
        self.sweep.run(None)
    }
}
