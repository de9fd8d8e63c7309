// ==========================================
// 线索管理后端 - 去重标记数据仓储
// ==========================================
// 职责: 两条集合式 UPDATE，按归一化身份键分区，除最早一条外全部标记重复
// 红线: 只会把 is_duplicate 置 1，从不清除
// 红线: 分区内排序 created_at ASC, id ASC（id 为确定性次序键）
// 说明: 每条 UPDATE 在独立事务中提交，返回本次新标记的行数
// ==========================================

use crate::domain::types::format_ts;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 公司：同 (lower(trim(name)), lower(trim(website)) 或 '', segment_id) 视为同一公司
const FLAG_COMPANY_DUPLICATES_SQL: &str = r#"
    UPDATE companies
    SET is_duplicate = 1, updated_at = ?1
    WHERE is_duplicate = 0
      AND id IN (
        SELECT id FROM (
            SELECT id,
                   ROW_NUMBER() OVER (
                       PARTITION BY LOWER(TRIM(name)),
                                    COALESCE(LOWER(TRIM(website)), ''),
                                    segment_id
                       ORDER BY created_at ASC, id ASC
                   ) AS rn
            FROM companies
            WHERE is_active = 1
        )
        WHERE rn > 1
      )
"#;

/// 联系人：同 (lower(trim(email)), company_id) 视为同一联系人
const FLAG_CONTACT_DUPLICATES_SQL: &str = r#"
    UPDATE contacts
    SET is_duplicate = 1, updated_at = ?1
    WHERE is_duplicate = 0
      AND id IN (
        SELECT id FROM (
            SELECT id,
                   ROW_NUMBER() OVER (
                       PARTITION BY LOWER(TRIM(email)), company_id
                       ORDER BY created_at ASC, id ASC
                   ) AS rn
            FROM contacts
            WHERE is_active = 1
        )
        WHERE rn > 1
      )
"#;

pub struct DedupRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DedupRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn run_in_tx(&self, sql: &str, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let flagged = tx.execute(sql, params![format_ts(&now)])?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(flagged)
    }

    /// 公司去重标记，返回新标记行数
    pub fn flag_duplicate_companies(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.run_in_tx(FLAG_COMPANY_DUPLICATES_SQL, now)
    }

    /// 联系人去重标记，返回新标记行数
    pub fn flag_duplicate_contacts(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.run_in_tx(FLAG_CONTACT_DUPLICATES_SQL, now)
    }
}
