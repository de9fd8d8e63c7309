// ==========================================
// 线索管理后端 - 公司 API
// ==========================================
// 职责: 公司创建、审批/拒绝、通用更新、软删除、查询
// 红线: 仅 pending 可审批/拒绝，且只转换一次
// 红线: 创建/改细分时细分必须为 active
// 红线: 先提交业务变更，再写审计
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::guard::{perms, AccessGuard};
use crate::domain::audit::{changes_to_details, AuditAction, AuditEntity};
use crate::domain::company::{Company, CompanyUpdate, NewCompany};
use crate::domain::types::CompanyStatus;
use crate::engine::lifecycle::{apply_company_update, check_company_transition, check_rejection_reason};
use crate::repository::{CompanyRepository, SegmentRepository};

// ==========================================
// CompanyApi
// ==========================================
pub struct CompanyApi {
    company_repo: Arc<CompanyRepository>,
    segment_repo: Arc<SegmentRepository>,
    guard: Arc<AccessGuard>,
}

impl CompanyApi {
    pub fn new(
        company_repo: Arc<CompanyRepository>,
        segment_repo: Arc<SegmentRepository>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            company_repo,
            segment_repo,
            guard,
        }
    }

    /// 手工创建公司（状态 pending）
    ///
    /// # 返回
    /// - Err(BusinessRuleViolation): 细分已归档
    /// - Err(NotFound): 细分不存在
    /// - Err(InvalidInput): 名称为空 / URL 或年份不合法
    #[instrument(skip(self, new_company), fields(segment_id = %new_company.segment_id))]
    pub fn create_company(&self, actor_id: &str, new_company: NewCompany) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::CREATE)?;
        self.require_active_segment(&new_company.segment_id)?;

        let mut company = NewCompany {
            segment_id: new_company.segment_id.clone(),
            ..Default::default()
        }
        .into_draft(actor_id, None, Utc::now());
        apply_company_update(&mut company, &CompanyUpdate::from(&new_company))?;

        self.company_repo.insert(&company)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Create,
            AuditEntity::Company,
            Some(&company.id),
            Some(json!({ "name": company.name, "segment_id": company.segment_id })),
        );
        info!(company_id = %company.id, "公司已创建");
        Ok(company)
    }

    pub fn get_company(&self, actor_id: &str, company_id: &str) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::READ)?;
        self.load(company_id)
    }

    pub fn list_by_segment(&self, actor_id: &str, segment_id: &str) -> ApiResult<Vec<Company>> {
        self.guard.require(actor_id, perms::COMPANIES, perms::READ)?;
        Ok(self.company_repo.list_by_segment(segment_id)?)
    }

    /// 审批：pending → approved
    pub fn approve_company(&self, actor_id: &str, company_id: &str) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::APPROVE)?;
        self.decide(actor_id, company_id, CompanyStatus::Approved, None)
    }

    /// 拒绝：pending → rejected，原因去空白后不能为空，按原样保存
    pub fn reject_company(
        &self,
        actor_id: &str,
        company_id: &str,
        reason: &str,
    ) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::REJECT)?;
        self.decide(actor_id, company_id, CompanyStatus::Rejected, Some(reason))
    }

    fn decide(
        &self,
        actor_id: &str,
        company_id: &str,
        target: CompanyStatus,
        reason: Option<&str>,
    ) -> ApiResult<Company> {
        let current = self.load(company_id)?;
        check_company_transition(current.status, target)?;
        let reason = reason.map(check_rejection_reason).transpose()?;

        // WHERE status = 'pending' 兜底并发修改
        if self.company_repo.decide(company_id, target, reason, Utc::now())? == 0 {
            let latest = self.load(company_id)?;
            return Err(ApiError::InvalidStateTransition {
                from: latest.status.to_string(),
                to: target.to_string(),
            });
        }

        let (action, details) = match target {
            CompanyStatus::Rejected => (AuditAction::Reject, json!({ "reason": reason })),
            _ => (AuditAction::Approve, json!({ "from": current.status.as_str() })),
        };
        self.guard.audit(
            Some(actor_id),
            action,
            AuditEntity::Company,
            Some(company_id),
            Some(details),
        );
        info!(company_id, status = %target, "公司状态已变更");
        self.load(company_id)
    }

    /// 通用更新：只写回发生变化的字段，审计记录每个字段的 {old, new}
    pub fn update_company(
        &self,
        actor_id: &str,
        company_id: &str,
        update: CompanyUpdate,
    ) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::EDIT)?;

        let mut company = self.load(company_id)?;
        if let Some(segment_id) = update.segment_id.as_deref().map(str::trim) {
            if segment_id != company.segment_id && !segment_id.is_empty() {
                self.require_active_segment(segment_id)?;
            }
        }

        let changes = apply_company_update(&mut company, &update)?;
        if changes.is_empty() {
            return Ok(company);
        }

        company.updated_at = Utc::now();
        self.company_repo.update_fields(&company)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Update,
            AuditEntity::Company,
            Some(company_id),
            Some(changes_to_details(&changes)),
        );
        Ok(company)
    }

    /// 软删除（is_active = false）
    pub fn deactivate_company(&self, actor_id: &str, company_id: &str) -> ApiResult<Company> {
        self.guard.require(actor_id, perms::COMPANIES, perms::EDIT)?;
        self.load(company_id)?;

        if self.company_repo.deactivate(company_id, Utc::now())? {
            self.guard.audit(
                Some(actor_id),
                AuditAction::Deactivate,
                AuditEntity::Company,
                Some(company_id),
                None,
            );
        }
        self.load(company_id)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn load(&self, company_id: &str) -> ApiResult<Company> {
        self.company_repo
            .find_by_id(company_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Company(id={})不存在", company_id)))
    }

    fn require_active_segment(&self, segment_id: &str) -> ApiResult<()> {
        let segment = self
            .segment_repo
            .find_by_id(segment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Segment(id={})不存在", segment_id)))?;
        if !segment.is_active() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "细分 '{}' 已归档",
                segment.name
            )));
        }
        Ok(())
    }
}
