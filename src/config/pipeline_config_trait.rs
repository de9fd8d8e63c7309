// ==========================================
// 线索管理后端 - 流水线配置读取 Trait
// ==========================================
// 职责: 定义导入与定时去重所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// PipelineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PipelineConfigReader: Send + Sync {
    /// 上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 10485760 (10 MiB)
    async fn get_max_upload_bytes(&self) -> RepositoryResult<u64>;

    /// 去重任务 cron 表达式（秒 分 时 日 月 周）
    ///
    /// # 默认值
    /// - "0 0 2 * * Sun"（每周日 02:00 UTC）
    async fn get_dedup_cron(&self) -> RepositoryResult<String>;

    /// 是否启用定时去重
    ///
    /// # 默认值
    /// - true
    async fn get_dedup_enabled(&self) -> RepositoryResult<bool>;
}
