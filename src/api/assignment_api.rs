// ==========================================
// 线索管理后端 - 负责人分配 API
// ==========================================
// 职责: 细分 / 公司 / 联系人的负责人分配与取消；"我的细分"视图
// 红线: 同一对象对同一用户只保留一条有效分配
// 红线: 取消分配为软删除，审计记在被分配对象上
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::guard::{perms, AccessGuard};
use crate::domain::assignment::{Assignment, AssignmentFilter, AssignmentTarget};
use crate::domain::audit::AuditAction;
use crate::domain::segment::Segment;
use crate::repository::collaborators::UserDirectory;
use crate::repository::{
    AssignmentRepository, CompanyRepository, ContactRepository, SegmentRepository,
};

// ==========================================
// AssignmentApi
// ==========================================
pub struct AssignmentApi {
    assignment_repo: Arc<AssignmentRepository>,
    segment_repo: Arc<SegmentRepository>,
    company_repo: Arc<CompanyRepository>,
    contact_repo: Arc<ContactRepository>,
    users: Arc<dyn UserDirectory>,
    guard: Arc<AccessGuard>,
}

impl AssignmentApi {
    pub fn new(
        assignment_repo: Arc<AssignmentRepository>,
        segment_repo: Arc<SegmentRepository>,
        company_repo: Arc<CompanyRepository>,
        contact_repo: Arc<ContactRepository>,
        users: Arc<dyn UserDirectory>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            assignment_repo,
            segment_repo,
            company_repo,
            contact_repo,
            users,
            guard,
        }
    }

    /// 将对象分配给用户
    ///
    /// # 返回
    /// - Err(NotFound): 对象或被分配用户不存在
    /// - Err(BusinessRuleViolation): 被分配用户已停用
    /// - Err(Conflict): 已存在相同的有效分配
    pub fn create_assignment(
        &self,
        actor_id: &str,
        target: AssignmentTarget,
        entity_id: &str,
        assigned_to: &str,
    ) -> ApiResult<Assignment> {
        self.guard.require(actor_id, perms::ASSIGNMENTS, perms::CREATE)?;

        self.ensure_target_exists(target, entity_id)?;
        let assignee = self
            .users
            .find_user(assigned_to)?
            .ok_or_else(|| ApiError::NotFound(format!("User(id={})不存在", assigned_to)))?;
        if !assignee.is_active {
            return Err(ApiError::BusinessRuleViolation(format!(
                "用户 {} 已停用，不能分配",
                assignee.email
            )));
        }
        if self
            .assignment_repo
            .find_active(target, entity_id, assigned_to)?
            .is_some()
        {
            return Err(ApiError::Conflict(format!(
                "{}(id={}) 已分配给用户 {}",
                target, entity_id, assigned_to
            )));
        }

        let now = Utc::now();
        let assignment = Assignment {
            id: Uuid::new_v4().to_string(),
            target,
            entity_id: entity_id.to_string(),
            assigned_to: assigned_to.to_string(),
            assigned_by: actor_id.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        // 并发插入由唯一索引兜底 (UniqueConstraintViolation → Conflict)
        self.assignment_repo.insert(&assignment)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Assign,
            target.audit_entity(),
            Some(entity_id),
            Some(json!({ "assignment_id": assignment.id, "assigned_to": assigned_to })),
        );
        info!(
            assignment_id = %assignment.id,
            entity_type = %target,
            entity_id,
            assigned_to,
            "负责人已分配"
        );
        Ok(assignment)
    }

    /// 列出有效分配
    pub fn list_assignments(
        &self,
        actor_id: &str,
        filter: &AssignmentFilter,
    ) -> ApiResult<Vec<Assignment>> {
        self.guard.require(actor_id, perms::ASSIGNMENTS, perms::READ)?;
        Ok(self.assignment_repo.list_active(filter)?)
    }

    /// 取消分配（软删除）
    ///
    /// # 返回
    /// - Err(NotFound): 分配不存在或已取消
    pub fn delete_assignment(&self, actor_id: &str, assignment_id: &str) -> ApiResult<Assignment> {
        self.guard.require(actor_id, perms::ASSIGNMENTS, perms::DELETE)?;

        let current = self.load(assignment_id)?;
        if !self.assignment_repo.deactivate(assignment_id, Utc::now())? {
            return Err(ApiError::NotFound(format!(
                "Assignment(id={})不存在或已取消",
                assignment_id
            )));
        }

        self.guard.audit(
            Some(actor_id),
            AuditAction::Unassign,
            current.target.audit_entity(),
            Some(&current.entity_id),
            Some(json!({ "assignment_id": assignment_id, "unassigned_user": current.assigned_to })),
        );
        info!(assignment_id, "负责人分配已取消");
        self.load(assignment_id)
    }

    /// 我的细分：当前用户有效分配的 active 细分
    pub fn list_my_segments(&self, actor_id: &str) -> ApiResult<Vec<Segment>> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::READ)?;
        Ok(self.segment_repo.list_assigned_to(actor_id)?)
    }

    fn load(&self, assignment_id: &str) -> ApiResult<Assignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Assignment(id={})不存在", assignment_id)))
    }

    fn ensure_target_exists(&self, target: AssignmentTarget, entity_id: &str) -> ApiResult<()> {
        let exists = match target {
            AssignmentTarget::Segment => self.segment_repo.find_by_id(entity_id)?.is_some(),
            AssignmentTarget::Company => self.company_repo.find_by_id(entity_id)?.is_some(),
            AssignmentTarget::Contact => self.contact_repo.find_by_id(entity_id)?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("{}(id={})不存在", target, entity_id)))
        }
    }
}
