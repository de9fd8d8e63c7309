// ==========================================
// 线索管理后端 - 联系人 API
// ==========================================
// 职责: 联系人创建、线性状态推进、批量审批、通用更新、软删除
// 状态: uploaded → approved → assigned_to_sdr → meeting_scheduled
// 红线: segment_id 由公司决定；公司必须为 approved
// 红线: 每次推进都由 WHERE status = <前置状态> 兜底并发修改
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::guard::{perms, AccessGuard};
use crate::domain::audit::{changes_to_details, AuditAction, AuditEntity};
use crate::domain::contact::{Contact, ContactUpdate, NewContact};
use crate::domain::types::{CompanyStatus, ContactStatus};
use crate::engine::lifecycle::{apply_contact_update, check_contact_transition};
use crate::repository::collaborators::UserDirectory;
use crate::repository::{CompanyRepository, ContactRepository, RepositoryResult};

/// 批量审批结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkApproveResult {
    pub approved_count: usize,
    pub approved_ids: Vec<String>,
}

// ==========================================
// ContactApi
// ==========================================
pub struct ContactApi {
    contact_repo: Arc<ContactRepository>,
    company_repo: Arc<CompanyRepository>,
    users: Arc<dyn UserDirectory>,
    guard: Arc<AccessGuard>,
}

impl ContactApi {
    pub fn new(
        contact_repo: Arc<ContactRepository>,
        company_repo: Arc<CompanyRepository>,
        users: Arc<dyn UserDirectory>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            contact_repo,
            company_repo,
            users,
            guard,
        }
    }

    /// 手工创建联系人（状态 uploaded，segment_id 取自公司）
    ///
    /// # 返回
    /// - Err(BusinessRuleViolation): 公司不是 approved 或已停用
    /// - Err(NotFound): 公司不存在
    #[instrument(skip(self, new_contact), fields(company_id = %new_contact.company_id))]
    pub fn create_contact(&self, actor_id: &str, new_contact: NewContact) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::CREATE)?;

        let company = self
            .company_repo
            .find_by_id(&new_contact.company_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Company(id={})不存在", new_contact.company_id))
            })?;
        if company.status != CompanyStatus::Approved || !company.is_active {
            return Err(ApiError::BusinessRuleViolation(format!(
                "公司 '{}' 未审批通过或已停用 (status={}, active={})",
                company.name, company.status, company.is_active
            )));
        }

        let mut contact = NewContact {
            company_id: company.id.clone(),
            ..Default::default()
        }
        .into_draft(&company, actor_id, None, Utc::now());
        apply_contact_update(&mut contact, &ContactUpdate::from(&new_contact))?;

        self.contact_repo.insert(&contact)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Create,
            AuditEntity::Contact,
            Some(&contact.id),
            Some(json!({ "company_id": contact.company_id, "segment_id": contact.segment_id })),
        );
        info!(contact_id = %contact.id, "联系人已创建");
        Ok(contact)
    }

    pub fn get_contact(&self, actor_id: &str, contact_id: &str) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::READ)?;
        self.load(contact_id)
    }

    pub fn list_by_company(&self, actor_id: &str, company_id: &str) -> ApiResult<Vec<Contact>> {
        self.guard.require(actor_id, perms::CONTACTS, perms::READ)?;
        Ok(self.contact_repo.list_by_company(company_id)?)
    }

    pub fn list_by_sdr(&self, actor_id: &str, sdr_id: &str) -> ApiResult<Vec<Contact>> {
        self.guard.require(actor_id, perms::CONTACTS, perms::READ)?;
        Ok(self.contact_repo.list_by_sdr(sdr_id)?)
    }

    // ==========================================
    // 状态推进
    // ==========================================

    /// uploaded → approved
    pub fn approve_contact(&self, actor_id: &str, contact_id: &str) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::APPROVE)?;
        self.advance(
            actor_id,
            contact_id,
            ContactStatus::Approved,
            AuditAction::Approve,
            None,
            |repo, now| repo.approve(contact_id, now),
        )
    }

    /// 批量审批：单条集合式 UPDATE，非 uploaded 的 id 静默跳过
    pub fn bulk_approve(&self, actor_id: &str, contact_ids: &[String]) -> ApiResult<BulkApproveResult> {
        self.guard.require(actor_id, perms::CONTACTS, perms::APPROVE)?;
        if contact_ids.is_empty() {
            return Err(ApiError::InvalidInput("联系人 id 列表不能为空".to_string()));
        }

        let approved_ids = self.contact_repo.bulk_approve(contact_ids, Utc::now())?;
        let result = BulkApproveResult {
            approved_count: approved_ids.len(),
            approved_ids,
        };

        self.guard.audit(
            Some(actor_id),
            AuditAction::BulkApprove,
            AuditEntity::Contact,
            None,
            Some(json!({
                "requested": contact_ids.len(),
                "approved_count": result.approved_count,
                "approved_ids": result.approved_ids,
            })),
        );
        info!(
            requested = contact_ids.len(),
            approved = result.approved_count,
            "批量审批完成"
        );
        Ok(result)
    }

    /// approved → assigned_to_sdr，SDR 必须是存在且启用的用户
    pub fn assign_sdr(&self, actor_id: &str, contact_id: &str, sdr_id: &str) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::ASSIGN)?;

        let current = self.load(contact_id)?;
        check_contact_transition(current.status, ContactStatus::AssignedToSdr)?;

        let sdr = self
            .users
            .find_user(sdr_id)?
            .ok_or_else(|| ApiError::NotFound(format!("User(id={})不存在", sdr_id)))?;
        if !sdr.is_active {
            return Err(ApiError::BusinessRuleViolation(format!(
                "用户 {} 已停用，不能分配",
                sdr.email
            )));
        }

        self.advance(
            actor_id,
            contact_id,
            ContactStatus::AssignedToSdr,
            AuditAction::AssignSdr,
            Some(json!({ "sdr_id": sdr_id })),
            |repo, now| repo.assign_sdr(contact_id, sdr_id, now),
        )
    }

    /// assigned_to_sdr → meeting_scheduled
    pub fn schedule_meeting(&self, actor_id: &str, contact_id: &str) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::SCHEDULE_MEETING)?;
        self.advance(
            actor_id,
            contact_id,
            ContactStatus::MeetingScheduled,
            AuditAction::ScheduleMeeting,
            None,
            |repo, now| repo.schedule_meeting(contact_id, now),
        )
    }

    /// 单条推进：规则判定 → 带前置状态守卫的 UPDATE → 审计
    fn advance<F>(
        &self,
        actor_id: &str,
        contact_id: &str,
        target: ContactStatus,
        action: AuditAction,
        details: Option<JsonValue>,
        write: F,
    ) -> ApiResult<Contact>
    where
        F: FnOnce(&ContactRepository, DateTime<Utc>) -> RepositoryResult<usize>,
    {
        let current = self.load(contact_id)?;
        check_contact_transition(current.status, target)?;

        if write(self.contact_repo.as_ref(), Utc::now())? == 0 {
            let latest = self.load(contact_id)?;
            return Err(ApiError::InvalidStateTransition {
                from: latest.status.to_string(),
                to: target.to_string(),
            });
        }

        self.guard.audit(
            Some(actor_id),
            action,
            AuditEntity::Contact,
            Some(contact_id),
            details,
        );
        info!(contact_id, status = %target, "联系人状态已推进");
        self.load(contact_id)
    }

    // ==========================================
    // 更新 / 软删除
    // ==========================================

    /// 通用更新（company_id / segment_id / status 不在命令中）
    pub fn update_contact(
        &self,
        actor_id: &str,
        contact_id: &str,
        update: ContactUpdate,
    ) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::EDIT)?;

        let mut contact = self.load(contact_id)?;
        let changes = apply_contact_update(&mut contact, &update)?;
        if changes.is_empty() {
            return Ok(contact);
        }

        contact.updated_at = Utc::now();
        self.contact_repo.update_fields(&contact)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Update,
            AuditEntity::Contact,
            Some(contact_id),
            Some(changes_to_details(&changes)),
        );
        Ok(contact)
    }

    pub fn deactivate_contact(&self, actor_id: &str, contact_id: &str) -> ApiResult<Contact> {
        self.guard.require(actor_id, perms::CONTACTS, perms::EDIT)?;
        self.load(contact_id)?;

        if self.contact_repo.deactivate(contact_id, Utc::now())? {
            self.guard.audit(
                Some(actor_id),
                AuditAction::Deactivate,
                AuditEntity::Contact,
                Some(contact_id),
                None,
            );
        }
        self.load(contact_id)
    }

    fn load(&self, contact_id: &str) -> ApiResult<Contact> {
        self.contact_repo
            .find_by_id(contact_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Contact(id={})不存在", contact_id)))
    }
}
