// ==========================================
// 线索管理后端 - 上传 API
// ==========================================
// 职责: CSV 上传入口、批次查询、错误清单、错误更正标记
// ==========================================

use std::sync::Arc;

use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::guard::{perms, AccessGuard};
use crate::domain::audit::{AuditAction, AuditEntity};
use crate::domain::types::EntityType;
use crate::domain::upload::{BatchResult, UploadBatch, UploadError};
use crate::importer::{BatchImporter, UploadFile};
use crate::repository::UploadRepository;

/// 实体类型对应的权限模块
fn module_of(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Company => perms::COMPANIES,
        EntityType::Contact => perms::CONTACTS,
    }
}

// ==========================================
// UploadApi
// ==========================================
pub struct UploadApi {
    importer: Arc<dyn BatchImporter>,
    upload_repo: Arc<UploadRepository>,
    guard: Arc<AccessGuard>,
}

impl UploadApi {
    pub fn new(
        importer: Arc<dyn BatchImporter>,
        upload_repo: Arc<UploadRepository>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            importer,
            upload_repo,
            guard,
        }
    }

    /// 上传 CSV
    ///
    /// # 返回
    /// - Ok(BatchResult): 批次摘要（行级错误通过 list_batch_errors 查询）
    /// - Err(ImportRejected): 编码 / 大小 / 表头快速失败
    pub async fn upload_csv(
        &self,
        actor_id: &str,
        entity_type: EntityType,
        file_name: &str,
        bytes: &[u8],
    ) -> ApiResult<BatchResult> {
        self.guard
            .require(actor_id, module_of(entity_type), perms::UPLOAD_CSV)?;
        Ok(self
            .importer
            .import_batch(bytes, file_name, entity_type, actor_id)
            .await?)
    }

    /// 一次上传多个文件，结果与输入一一对应
    pub async fn upload_many(
        &self,
        actor_id: &str,
        entity_type: EntityType,
        files: Vec<UploadFile>,
    ) -> ApiResult<Vec<ApiResult<BatchResult>>> {
        self.guard
            .require(actor_id, module_of(entity_type), perms::UPLOAD_CSV)?;
        let results = self.importer.import_many(files, entity_type, actor_id).await;
        Ok(results
            .into_iter()
            .map(|r| r.map_err(ApiError::from))
            .collect())
    }

    pub fn get_batch(&self, actor_id: &str, batch_id: &str) -> ApiResult<UploadBatch> {
        self.guard.require(actor_id, perms::UPLOADS, perms::READ)?;
        self.load_batch(batch_id)
    }

    /// 调用人自己的批次（最新在前）
    pub fn list_batches(&self, actor_id: &str) -> ApiResult<Vec<UploadBatch>> {
        self.guard.require(actor_id, perms::UPLOADS, perms::READ)?;
        Ok(self.upload_repo.list_batches_by_uploader(actor_id)?)
    }

    /// 批次错误清单（行号升序，其次列名）
    pub fn list_batch_errors(&self, actor_id: &str, batch_id: &str) -> ApiResult<Vec<UploadError>> {
        self.guard.require(actor_id, perms::UPLOADS, perms::READ)?;
        self.load_batch(batch_id)?;
        Ok(self.upload_repo.list_errors(batch_id)?)
    }

    /// 标记错误已更正（需要对应实体的编辑权限）
    pub fn mark_error_corrected(&self, actor_id: &str, error_id: &str) -> ApiResult<UploadError> {
        let error = self
            .upload_repo
            .find_error(error_id)?
            .ok_or_else(|| ApiError::NotFound(format!("UploadError(id={})不存在", error_id)))?;
        let batch = self.load_batch(&error.batch_id)?;
        self.guard
            .require(actor_id, module_of(batch.entity_type), perms::EDIT)?;

        if self.upload_repo.mark_error_corrected(error_id)? {
            self.guard.audit(
                Some(actor_id),
                AuditAction::CorrectError,
                AuditEntity::UploadError,
                Some(error_id),
                Some(json!({ "batch_id": batch.id, "row_number": error.row_number })),
            );
        }

        self.upload_repo
            .find_error(error_id)?
            .ok_or_else(|| ApiError::NotFound(format!("UploadError(id={})不存在", error_id)))
    }

    fn load_batch(&self, batch_id: &str) -> ApiResult<UploadBatch> {
        self.upload_repo
            .get_batch(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("UploadBatch(id={})不存在", batch_id)))
    }
}
