// ==========================================
// 线索管理后端 - 上传批次数据仓储
// ==========================================
// 对齐: upload_batches / upload_errors 表
// 红线: 批次收尾（草稿 + 错误 + 计数）在同一事务内落库
// ==========================================

use crate::domain::types::{format_ts, parse_ts, BatchStatus, EntityType};
use crate::domain::upload::{EntityDraft, UploadBatch, UploadError};
use crate::repository::company_repo::insert_company;
use crate::repository::contact_repo::insert_contact;
use crate::repository::decode_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

const BATCH_COLUMNS: &str = "id, entity_type, file_name, file_size_bytes, total_rows, valid_rows, invalid_rows, status, uploader_id, created_at";

const ERROR_COLUMNS: &str =
    "id, batch_id, row_number, column_name, value, error_message, is_corrected, created_at";

pub struct UploadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UploadRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 批次
    // ==========================================

    /// 创建处理中批次
    pub fn create_batch(&self, batch: &UploadBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO upload_batches ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                BATCH_COLUMNS
            ),
            params![
                batch.id,
                batch.entity_type.as_str(),
                batch.file_name,
                batch.file_size_bytes,
                batch.total_rows,
                batch.valid_rows,
                batch.invalid_rows,
                batch.status.as_str(),
                batch.uploader_id,
                format_ts(&batch.created_at),
            ],
        )?;
        Ok(())
    }

    /// 批次收尾：落库全部草稿、全部错误记录，并写入最终计数与状态
    ///
    /// # 参数
    /// - `batch`: 含最终计数与状态的批次
    /// - `drafts`: 校验通过的草稿（按文件顺序）
    /// - `errors`: 错误记录
    pub fn finalize_batch(
        &self,
        batch: &UploadBatch,
        drafts: &[EntityDraft],
        errors: &[UploadError],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for draft in drafts {
            match draft {
                EntityDraft::Company(c) => insert_company(&tx, c)?,
                EntityDraft::Contact(c) => insert_contact(&tx, c)?,
            };
        }

        for err in errors {
            insert_error(&tx, err)?;
        }

        let updated = tx.execute(
            r#"
            UPDATE upload_batches
            SET total_rows = ?1, valid_rows = ?2, invalid_rows = ?3, status = ?4
            WHERE id = ?5
            "#,
            params![
                batch.total_rows,
                batch.valid_rows,
                batch.invalid_rows,
                batch.status.as_str(),
                batch.id,
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "UploadBatch".to_string(),
                id: batch.id.clone(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            batch_id = %batch.id,
            drafts = drafts.len(),
            errors = errors.len(),
            "批次收尾事务已提交"
        );
        Ok(())
    }

    /// 标记批次失败（收尾事务失败时调用）
    pub fn mark_failed(&self, batch_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE upload_batches SET status = 'failed' WHERE id = ?1 AND status = 'processing'",
            params![batch_id],
        )?;
        Ok(())
    }

    pub fn get_batch(&self, batch_id: &str) -> RepositoryResult<Option<UploadBatch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM upload_batches WHERE id = ?1", BATCH_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![batch_id], map_batch) {
            Ok(b) => Ok(Some(b)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 某上传人的批次（最新在前）
    pub fn list_batches_by_uploader(&self, uploader_id: &str) -> RepositoryResult<Vec<UploadBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM upload_batches WHERE uploader_id = ?1 ORDER BY created_at DESC, id DESC",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![uploader_id], map_batch)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 错误记录
    // ==========================================

    /// 批次错误列表（按行号、列名升序）
    pub fn list_errors(&self, batch_id: &str) -> RepositoryResult<Vec<UploadError>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM upload_errors WHERE batch_id = ?1 ORDER BY row_number ASC, column_name ASC",
            ERROR_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![batch_id], map_error)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_error(&self, error_id: &str) -> RepositoryResult<Option<UploadError>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM upload_errors WHERE id = ?1", ERROR_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![error_id], map_error) {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 标记已更正（错误记录唯一可变字段）
    pub fn mark_error_corrected(&self, error_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE upload_errors SET is_corrected = 1 WHERE id = ?1 AND is_corrected = 0",
            params![error_id],
        )?;
        Ok(rows > 0)
    }
}

fn insert_error(conn: &Connection, e: &UploadError) -> SqliteResult<usize> {
    conn.execute(
        &format!(
            "INSERT INTO upload_errors ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            ERROR_COLUMNS
        ),
        params![
            e.id,
            e.batch_id,
            e.row_number,
            e.column_name,
            e.value,
            e.error_message,
            e.is_corrected,
            format_ts(&e.created_at),
        ],
    )
}

fn map_batch(row: &Row) -> SqliteResult<UploadBatch> {
    Ok(UploadBatch {
        id: row.get(0)?,
        entity_type: decode_enum(1, row.get(1)?, EntityType::from_db_str)?,
        file_name: row.get(2)?,
        file_size_bytes: row.get(3)?,
        total_rows: row.get(4)?,
        valid_rows: row.get(5)?,
        invalid_rows: row.get(6)?,
        status: decode_enum(7, row.get(7)?, BatchStatus::from_db_str)?,
        uploader_id: row.get(8)?,
        created_at: parse_ts(&row.get::<_, String>(9)?),
    })
}

fn map_error(row: &Row) -> SqliteResult<UploadError> {
    Ok(UploadError {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        row_number: row.get(2)?,
        column_name: row.get(3)?,
        value: row.get(4)?,
        error_message: row.get(5)?,
        is_corrected: row.get(6)?,
        created_at: parse_ts(&row.get::<_, String>(7)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::company::NewCompany;
    use crate::domain::upload::FieldError;
    use chrono::Utc;

    fn setup() -> UploadRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO users (id, email, name, is_active, created_at)
            VALUES ('u1', 'r@x.io', 'Researcher', 1, '2026-01-01T00:00:00.000000Z');
            INSERT INTO segments (id, name, status, created_by, created_at, updated_at)
            VALUES ('s1', 'Fintech', 'active', 'u1', '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z');
            "#,
        )
        .unwrap();
        UploadRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_finalize_persists_everything_and_orders_errors() {
        let repo = setup();
        let mut batch = UploadBatch::start(EntityType::Company, "c.csv", 120, "u1", Utc::now());
        repo.create_batch(&batch).unwrap();

        let draft = NewCompany {
            name: "Acme".to_string(),
            segment_id: "s1".to_string(),
            ..Default::default()
        }
        .into_draft("u1", Some(&batch.id), Utc::now());

        let now = Utc::now();
        let errors = vec![
            FieldError::new(4, "Segment Name", Some(""), "Required").into_record(&batch.id, now),
            FieldError::new(3, "Founded Year", Some("1700"), "Invalid year").into_record(&batch.id, now),
            FieldError::new(3, "Company Name", Some(""), "Required").into_record(&batch.id, now),
        ];

        batch.total_rows = 3;
        batch.valid_rows = 1;
        batch.invalid_rows = 2;
        batch.status = BatchStatus::Completed;
        repo.finalize_batch(&batch, &[EntityDraft::Company(draft)], &errors)
            .unwrap();

        let stored = repo.get_batch(&batch.id).unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Completed);
        assert_eq!(stored.total_rows, stored.valid_rows + stored.invalid_rows);

        let listed = repo.list_errors(&batch.id).unwrap();
        let order: Vec<_> = listed
            .iter()
            .map(|e| (e.row_number, e.column_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(3, "Company Name"), (3, "Founded Year"), (4, "Segment Name")]
        );

        assert!(repo.mark_error_corrected(&listed[0].id).unwrap());
        assert!(!repo.mark_error_corrected(&listed[0].id).unwrap());
        assert!(repo.find_error(&listed[0].id).unwrap().unwrap().is_corrected);
    }

    #[test]
    fn test_finalize_rolls_back_on_bad_draft() {
        let repo = setup();
        let mut batch = UploadBatch::start(EntityType::Company, "c.csv", 10, "u1", Utc::now());
        repo.create_batch(&batch).unwrap();

        let bad = NewCompany {
            name: "Ghost".to_string(),
            segment_id: "no-such-segment".to_string(),
            ..Default::default()
        }
        .into_draft("u1", Some(&batch.id), Utc::now());
        let err = FieldError::new(2, "Company Name", Some(""), "Required")
            .into_record(&batch.id, Utc::now());

        batch.status = BatchStatus::Completed;
        let result = repo.finalize_batch(&batch, &[EntityDraft::Company(bad)], &[err]);
        assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation(_))));

        assert!(repo.list_errors(&batch.id).unwrap().is_empty());
        repo.mark_failed(&batch.id).unwrap();
        assert_eq!(
            repo.get_batch(&batch.id).unwrap().unwrap().status,
            BatchStatus::Failed
        );
    }
}
