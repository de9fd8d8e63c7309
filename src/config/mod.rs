// ==========================================
// 线索管理后端 - 配置层
// ==========================================
// 职责: 运行参数管理（上传上限、去重计划）
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

pub mod config_manager;
pub mod pipeline_config_trait;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, ConfigManager, DEFAULT_DEDUP_CRON, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use pipeline_config_trait::PipelineConfigReader;
