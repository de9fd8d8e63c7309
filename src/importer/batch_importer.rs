// ==========================================
// 线索管理后端 - 批次导入器
// ==========================================
// 流程: 解码 → 大小检查 → 表头检查 → 建批次 → 逐行校验 → 收尾事务 → 审计
// 红线: 快速失败（编码/大小/表头）发生在建批次之前
// 红线: 逐行阶段不持有事务；仅收尾为一个事务
// 红线: total_rows = valid_rows + invalid_rows
// ==========================================

use crate::config::PipelineConfigReader;
use crate::domain::audit::{AuditAction, AuditEntity};
use crate::domain::types::{BatchStatus, EntityType};
use crate::domain::upload::{BatchResult, EntityDraft, FieldError, UploadBatch, UploadError, ROW_LEVEL_COLUMN};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{decode_utf8, CsvParser, CsvRecord};
use crate::importer::row_validator::{DraftContext, ReferenceLookup, RowValidator};
use crate::repository::{AuditSink, UploadRepository};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// BatchImporter Trait
// ==========================================
#[async_trait]
pub trait BatchImporter: Send + Sync {
    /// 导入单个 CSV 文件
    ///
    /// # 参数
    /// - bytes: 文件原始字节
    /// - file_name: 文件名（仅记录）
    /// - entity_type: 公司 / 联系人
    /// - uploader_id: 上传人
    ///
    /// # 返回
    /// - Ok(BatchResult): 批次摘要（含行级错误的批次同样返回 Ok）
    /// - Err(InvalidEncoding | FileTooLarge | MissingColumns): 快速失败，未建批次
    /// - Err(Repository): 落库失败，批次已标记 failed
    async fn import_batch(
        &self,
        bytes: &[u8],
        file_name: &str,
        entity_type: EntityType,
        uploader_id: &str,
    ) -> ImportResult<BatchResult>;

    /// 并发导入多个文件（彼此独立，单个失败不影响其他文件）
    async fn import_many(
        &self,
        files: Vec<UploadFile>,
        entity_type: EntityType,
        uploader_id: &str,
    ) -> Vec<ImportResult<BatchResult>>;
}

/// 待导入文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

// ==========================================
// CsvBatchImporter
// ==========================================
pub struct CsvBatchImporter<L: ReferenceLookup + 'static> {
    config: Arc<dyn PipelineConfigReader>,
    pipeline: Arc<ImportPipeline<L>>,
}

impl<L: ReferenceLookup + 'static> CsvBatchImporter<L> {
    pub fn new(
        config: Arc<dyn PipelineConfigReader>,
        lookup: L,
        uploads: Arc<UploadRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(ImportPipeline {
                validator: RowValidator::new(lookup),
                uploads,
                audit,
            }),
        }
    }
}

#[async_trait]
impl<L: ReferenceLookup + 'static> BatchImporter for CsvBatchImporter<L> {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn import_batch(
        &self,
        bytes: &[u8],
        file_name: &str,
        entity_type: EntityType,
        uploader_id: &str,
    ) -> ImportResult<BatchResult> {
        let max_bytes = self.config.get_max_upload_bytes().await?;

        // 行校验含同步数据库查询，放到阻塞线程池
        let pipeline = Arc::clone(&self.pipeline);
        let bytes = bytes.to_vec();
        let file_name = file_name.to_string();
        let uploader_id = uploader_id.to_string();
        tokio::task::spawn_blocking(move || {
            pipeline.run(&bytes, &file_name, entity_type, &uploader_id, max_bytes)
        })
        .await
        .map_err(|e| ImportError::TaskJoin(e.to_string()))?
    }

    async fn import_many(
        &self,
        files: Vec<UploadFile>,
        entity_type: EntityType,
        uploader_id: &str,
    ) -> Vec<ImportResult<BatchResult>> {
        use futures::future::join_all;

        info!(count = files.len(), "开始批量导入文件");

        let tasks = files.iter().map(|file| async move {
            let result = self
                .import_batch(&file.bytes, &file.file_name, entity_type, uploader_id)
                .await;
            if let Err(e) = &result {
                error!(file = %file.file_name, error = %e, "文件导入失败");
            }
            result
        });
        let results = join_all(tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}

// ==========================================
// ImportPipeline - 同步导入流程
// ==========================================
struct ImportPipeline<L: ReferenceLookup> {
    validator: RowValidator<L>,
    uploads: Arc<UploadRepository>,
    audit: Arc<dyn AuditSink>,
}

impl<L: ReferenceLookup> ImportPipeline<L> {
    fn run(
        &self,
        bytes: &[u8],
        file_name: &str,
        entity_type: EntityType,
        uploader_id: &str,
        max_bytes: u64,
    ) -> ImportResult<BatchResult> {
        let start_time = Instant::now();

        // === 快速失败 ===
        let text = decode_utf8(bytes)?;
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(ImportError::FileTooLarge {
                size,
                limit: max_bytes,
            });
        }
        let rows = CsvParser.open(text, entity_type.required_columns())?;

        // === 建批次 ===
        let now = Utc::now();
        let mut batch = UploadBatch::start(entity_type, file_name, size as i64, uploader_id, now);
        self.uploads.create_batch(&batch)?;
        info!(batch_id = %batch.id, entity_type = %entity_type, file_name, "批次已创建");

        let ctx = DraftContext {
            batch_id: batch.id.clone(),
            uploader_id: uploader_id.to_string(),
            now,
        };

        // === 逐行校验 ===
        let mut drafts: Vec<EntityDraft> = Vec::new();
        let mut errors: Vec<UploadError> = Vec::new();
        for record in rows {
            batch.total_rows += 1;
            match record {
                CsvRecord::Row(row) => match self.validator.validate_row(&row, entity_type, &ctx) {
                    Ok(draft) => {
                        batch.valid_rows += 1;
                        drafts.push(draft);
                    }
                    Err(field_errors) => {
                        batch.invalid_rows += 1;
                        errors.extend(
                            field_errors
                                .into_iter()
                                .map(|e| e.into_record(&ctx.batch_id, now)),
                        );
                    }
                },
                CsvRecord::Malformed { row_number, message } => {
                    debug!(row_number, message = %message, "CSV 记录损坏");
                    batch.invalid_rows += 1;
                    errors.push(
                        FieldError::new(row_number, ROW_LEVEL_COLUMN, None, message)
                            .into_record(&ctx.batch_id, now),
                    );
                }
            }
        }

        // === 收尾事务 ===
        batch.status = BatchStatus::Completed;
        if let Err(e) = self.uploads.finalize_batch(&batch, &drafts, &errors) {
            error!(batch_id = %batch.id, error = %e, "批次收尾失败");
            if let Err(mark_err) = self.uploads.mark_failed(&batch.id) {
                warn!(batch_id = %batch.id, error = %mark_err, "标记批次失败状态失败");
            }
            return Err(e.into());
        }

        self.audit.record_or_warn(
            Some(uploader_id),
            AuditAction::Upload,
            AuditEntity::UploadBatch,
            Some(&batch.id),
            Some(json!({
                "entity_type": entity_type.as_str(),
                "file_name": file_name,
                "valid": batch.valid_rows,
                "invalid": batch.invalid_rows,
            })),
        );

        info!(
            batch_id = %batch.id,
            total = batch.total_rows,
            valid = batch.valid_rows,
            invalid = batch.invalid_rows,
            elapsed_ms = start_time.elapsed().as_millis(),
            "批次导入完成"
        );
        Ok(batch.summary())
    }
}
