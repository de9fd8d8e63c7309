// ==========================================
// 线索管理后端 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// PipelineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PipelineConfigReader for ConfigManager {
    async fn get_max_upload_bytes(&self) -> RepositoryResult<u64> {
        let value = self.get_config_or_default(
            config_keys::UPLOAD_MAX_FILE_BYTES,
            defaults::UPLOAD_MAX_FILE_BYTES,
        )?;
        Ok(value.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::UPLOAD_MAX_FILE_BYTES,
                raw_value = %value,
                "上传大小上限配置格式错误，使用默认值"
            );
            DEFAULT_MAX_UPLOAD_BYTES
        }))
    }

    async fn get_dedup_cron(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(config_keys::DEDUP_CRON, defaults::DEDUP_CRON)?;
        let value = value.trim();
        if value.is_empty() {
            Ok(defaults::DEDUP_CRON.to_string())
        } else {
            Ok(value.to_string())
        }
    }

    async fn get_dedup_enabled(&self) -> RepositoryResult<bool> {
        let value =
            self.get_config_or_default(config_keys::DEDUP_ENABLED, defaults::DEDUP_ENABLED)?;
        match value.trim().to_lowercase().as_str() {
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Ok(true),
        }
    }
}

/// 上传大小上限默认值（10 MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 去重调度默认值：每周日 02:00 UTC（秒 分 时 日 月 周）
pub const DEFAULT_DEDUP_CRON: &str = "0 0 2 * * Sun";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 上传
    pub const UPLOAD_MAX_FILE_BYTES: &str = "upload.max_file_bytes";

    // 去重
    pub const DEDUP_CRON: &str = "dedup.cron";
    pub const DEDUP_ENABLED: &str = "dedup.enabled";
}

mod defaults {
    pub const UPLOAD_MAX_FILE_BYTES: &str = "10485760";
    pub const DEDUP_CRON: &str = super::DEFAULT_DEDUP_CRON;
    pub const DEDUP_ENABLED: &str = "true";
}
