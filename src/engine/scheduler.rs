// ==========================================
// 线索管理后端 - 去重定时调度
// ==========================================
// 职责: 按 cron 表达式（含秒字段，UTC）周期触发去重扫描
// 红线: 调度器是 main 持有的显式值，无模块级可变状态
// 红线: 扫描在阻塞线程池执行；收到 shutdown 信号后退出循环
// ==========================================

use crate::engine::dedup::DedupReport;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("cron 表达式无效 '{expr}': {message}")]
    InvalidCron { expr: String, message: String },
}

/// 定时触发的去重执行方（系统身份，无操作人）
pub trait DedupRunner: Send + Sync {
    fn run_scheduled(&self) -> DedupReport;
}

/// 解析 cron 表达式（秒 分 时 日 月 周）
pub fn parse_cron(expr: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(expr.trim()).map_err(|e| SchedulerError::InvalidCron {
        expr: expr.to_string(),
        message: e.to_string(),
    })
}

// ==========================================
// DedupScheduler
// ==========================================
pub struct DedupScheduler {
    schedule: Schedule,
    runner: Arc<dyn DedupRunner>,
}

impl DedupScheduler {
    pub fn new(cron_expr: &str, runner: Arc<dyn DedupRunner>) -> Result<Self, SchedulerError> {
        Ok(Self {
            schedule: parse_cron(cron_expr)?,
            runner,
        })
    }

    /// 严格晚于 `after` 的下一次触发时间
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// 调度主循环，直到 shutdown 置为 true 或发送端关闭
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("去重调度器已启动");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            let Some(next) = self.next_fire_after(now) else {
                warn!("cron 表达式无后续触发时间，调度器退出");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_fire = %next, "等待下一次去重扫描");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let runner = Arc::clone(&self.runner);
                    match tokio::task::spawn_blocking(move || runner.run_scheduled()).await {
                        Ok(report) => info!(
                            companies_flagged = report.companies.flagged(),
                            contacts_flagged = report.contacts.flagged(),
                            fully_completed = report.is_fully_completed(),
                            "定时去重扫描结束"
                        ),
                        Err(e) => error!(error = %e, "定时去重扫描任务异常"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("去重调度器已停止");
    }
}
