// ==========================================
// 线索管理后端 - 应用状态
// ==========================================
// 职责: 装配仓储 / 引擎 / API 实例，管理共享连接
// 说明: 全部组件共享同一个 Arc<Mutex<Connection>>
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    AccessGuard, AssignmentApi, CompanyApi, ContactApi, DedupApi, SegmentApi, UploadApi,
};
use crate::config::{ConfigManager, PipelineConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::dedup::DedupSweep;
use crate::engine::scheduler::{DedupRunner, DedupScheduler, SchedulerError};
use crate::importer::{CsvBatchImporter, RepositoryReferenceLookup};
use crate::repository::{
    AssignmentRepository, AuditLogRepository, CompanyRepository, ContactRepository, DedupRepository, SegmentRepository,
    UploadRepository, UserRepository,
};

/// 应用状态
///
/// 包含所有 API 实例和共享资源
pub struct AppState {
    /// 数据库路径（内存库为 ":memory:"）
    pub db_path: String,

    pub segment_api: Arc<SegmentApi>,
    pub company_api: Arc<CompanyApi>,
    pub contact_api: Arc<ContactApi>,
    pub upload_api: Arc<UploadApi>,
    pub dedup_api: Arc<DedupApi>,
    pub assignment_api: Arc<AssignmentApi>,

    /// 配置（上传上限 / 去重调度）
    pub config: Arc<ConfigManager>,

    /// 用户 / 角色 / 权限仓储（种子数据与权限判定）
    pub user_repo: Arc<UserRepository>,

    /// 审计日志仓储（用于审计追踪查询）
    pub audit_log_repo: Arc<AuditLogRepository>,
}

impl AppState {
    /// 打开数据库文件并装配
    ///
    /// # 返回
    /// - Err(String): 打开数据库或建表失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化 AppState");

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_connection(db_path, conn)
    }

    /// 基于已打开的连接装配（建表幂等执行）
    pub fn from_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository 层
        // ==========================================
        let segment_repo = Arc::new(SegmentRepository::new(conn.clone()));
        let company_repo = Arc::new(CompanyRepository::new(conn.clone()));
        let contact_repo = Arc::new(ContactRepository::new(conn.clone()));
        let upload_repo = Arc::new(UploadRepository::new(conn.clone()));
        let dedup_repo = Arc::new(DedupRepository::new(conn.clone()));
        let user_repo = Arc::new(UserRepository::new(conn.clone()));
        let audit_log_repo = Arc::new(AuditLogRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));

        let config = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 权限与审计
        // ==========================================
        let guard = Arc::new(AccessGuard::new(user_repo.clone(), audit_log_repo.clone()));

        // ==========================================
        // 导入与去重
        // ==========================================
        let importer = Arc::new(CsvBatchImporter::new(
            config.clone() as Arc<dyn PipelineConfigReader>,
            RepositoryReferenceLookup::new(segment_repo.clone(), company_repo.clone()),
            upload_repo.clone(),
            audit_log_repo.clone(),
        ));
        let sweep = Arc::new(DedupSweep::new(dedup_repo, audit_log_repo.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let segment_api = Arc::new(SegmentApi::new(segment_repo.clone(), guard.clone()));
        let company_api = Arc::new(CompanyApi::new(
            company_repo.clone(),
            segment_repo.clone(),
            guard.clone(),
        ));
        let contact_api = Arc::new(ContactApi::new(
            contact_repo.clone(),
            company_repo.clone(),
            user_repo.clone(),
            guard.clone(),
        ));
        let assignment_api = Arc::new(AssignmentApi::new(
            assignment_repo,
            segment_repo,
            company_repo,
            contact_repo,
            user_repo.clone(),
            guard.clone(),
        ));
        let upload_api = Arc::new(UploadApi::new(importer, upload_repo, guard.clone()));
        let dedup_api = Arc::new(DedupApi::new(sweep, guard));

        tracing::info!("AppState 初始化完成");

        Ok(Self {
            db_path,
            segment_api,
            company_api,
            contact_api,
            upload_api,
            dedup_api,
            assignment_api,
            config,
            user_repo,
            audit_log_repo,
        })
    }

    /// 按配置构建去重调度器
    ///
    /// # 返回
    /// - Ok(None): dedup.enabled = false
    pub async fn dedup_scheduler(&self) -> Result<Option<DedupScheduler>, SchedulerError> {
        let enabled = self.config.get_dedup_enabled().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "读取 dedup.enabled 失败，按启用处理");
            true
        });
        if !enabled {
            tracing::info!("去重调度已禁用");
            return Ok(None);
        }

        let cron = match self.config.get_dedup_cron().await {
            Ok(expr) => expr,
            Err(e) => {
                tracing::warn!(error = %e, "读取 dedup.cron 失败，使用默认值");
                crate::config::DEFAULT_DEDUP_CRON.to_string()
            }
        };
        let runner: Arc<dyn DedupRunner> = self.dedup_api.clone();
        DedupScheduler::new(&cron, runner).map(Some)
    }
}

/// 获取默认数据库路径
///
/// 优先级：LEAD_PIPELINE_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./lead_pipeline.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("lead-pipeline");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("lead_pipeline.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "LEAD_PIPELINE_DB_PATH";
