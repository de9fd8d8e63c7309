// ==========================================
// 线索管理后端 - 服务主入口
// ==========================================
// 职责: 初始化日志与数据库，启动去重调度器，等待退出信号
// 说明: HTTP 路由层由外部宿主接入 AppState 中的 Api 实例
// ==========================================

use lead_pipeline::app::{get_default_db_path, AppState};
use lead_pipeline::logging;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", lead_pipeline::APP_NAME);
    tracing::info!("系统版本: {}", lead_pipeline::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    // ==========================================
    // 去重调度器
    // ==========================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = match state.dedup_scheduler().await? {
        Some(scheduler) => Some(tokio::spawn(scheduler.run(shutdown_rx))),
        None => None,
    };

    tracing::info!("服务已启动，Ctrl+C 退出");
    tokio::signal::ctrl_c().await?;
    tracing::info!("收到退出信号，正在停止...");

    // 接收端已退出时发送失败，可忽略
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "调度器任务异常退出");
        }
    }

    tracing::info!("服务已停止");
    Ok(())
}
