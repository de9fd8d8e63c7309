// ==========================================
// 线索管理后端 - 细分 / 产品线 API
// ==========================================
// 职责: 细分创建、归档/激活；产品线创建与关联
// 红线: 细分不删除；名称唯一
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::guard::{perms, AccessGuard};
use crate::domain::audit::{AuditAction, AuditEntity};
use crate::domain::segment::{Offering, Segment};
use crate::domain::types::SegmentStatus;
use crate::engine::normalizer::normalize_text;
use crate::repository::SegmentRepository;

// ==========================================
// SegmentApi
// ==========================================
pub struct SegmentApi {
    segment_repo: Arc<SegmentRepository>,
    guard: Arc<AccessGuard>,
}

impl SegmentApi {
    pub fn new(segment_repo: Arc<SegmentRepository>, guard: Arc<AccessGuard>) -> Self {
        Self {
            segment_repo,
            guard,
        }
    }

    /// 创建细分（状态 active，创建人为负责人）
    ///
    /// # 返回
    /// - Err(Conflict): 名称已存在
    pub fn create_segment(
        &self,
        actor_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Segment> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::CREATE)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("细分名称不能为空".to_string()));
        }
        if self.segment_repo.find_by_name(name)?.is_some() {
            return Err(ApiError::Conflict(format!("细分名称已存在: {}", name)));
        }

        let now = Utc::now();
        let segment = Segment {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: normalize_text(description),
            status: SegmentStatus::Active,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.segment_repo.insert(&segment)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Create,
            AuditEntity::Segment,
            Some(&segment.id),
            Some(json!({ "name": segment.name })),
        );
        info!(segment_id = %segment.id, name = %segment.name, "细分已创建");
        Ok(segment)
    }

    /// 归档细分（已归档时幂等返回）
    pub fn archive_segment(&self, actor_id: &str, segment_id: &str) -> ApiResult<Segment> {
        self.set_status(actor_id, segment_id, SegmentStatus::Archived, AuditAction::Archive)
    }

    /// 重新激活细分
    pub fn activate_segment(&self, actor_id: &str, segment_id: &str) -> ApiResult<Segment> {
        self.set_status(actor_id, segment_id, SegmentStatus::Active, AuditAction::Activate)
    }

    fn set_status(
        &self,
        actor_id: &str,
        segment_id: &str,
        status: SegmentStatus,
        action: AuditAction,
    ) -> ApiResult<Segment> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::ARCHIVE)?;

        let current = self.get_segment(segment_id)?;
        if self.segment_repo.set_status(segment_id, status, Utc::now())? {
            self.guard.audit(
                Some(actor_id),
                action,
                AuditEntity::Segment,
                Some(segment_id),
                Some(json!({ "status": { "old": current.status.as_str(), "new": status.as_str() } })),
            );
        }
        self.get_segment(segment_id)
    }

    pub fn get_segment(&self, segment_id: &str) -> ApiResult<Segment> {
        self.segment_repo
            .find_by_id(segment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Segment(id={})不存在", segment_id)))
    }

    pub fn list_segments(&self) -> ApiResult<Vec<Segment>> {
        Ok(self.segment_repo.list_all()?)
    }

    // ==========================================
    // 产品线
    // ==========================================

    pub fn create_offering(
        &self,
        actor_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Offering> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::CREATE)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("产品线名称不能为空".to_string()));
        }

        let offering = Offering {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: normalize_text(description),
            status: SegmentStatus::Active,
            created_at: Utc::now(),
        };
        // 重名由唯一约束转为 Conflict
        self.segment_repo.insert_offering(&offering)?;

        self.guard.audit(
            Some(actor_id),
            AuditAction::Create,
            AuditEntity::Offering,
            Some(&offering.id),
            Some(json!({ "name": offering.name })),
        );
        Ok(offering)
    }

    /// 关联细分与产品线（已关联时返回 false）
    pub fn link_offering(
        &self,
        actor_id: &str,
        segment_id: &str,
        offering_id: &str,
    ) -> ApiResult<bool> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::CREATE)?;
        self.get_segment(segment_id)?;
        if self.segment_repo.find_offering_by_id(offering_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Offering(id={})不存在",
                offering_id
            )));
        }

        let linked = self.segment_repo.link_offering(segment_id, offering_id)?;
        if linked {
            self.guard.audit(
                Some(actor_id),
                AuditAction::Update,
                AuditEntity::Segment,
                Some(segment_id),
                Some(json!({ "offering_linked": offering_id })),
            );
        }
        Ok(linked)
    }

    pub fn unlink_offering(
        &self,
        actor_id: &str,
        segment_id: &str,
        offering_id: &str,
    ) -> ApiResult<bool> {
        self.guard.require(actor_id, perms::SEGMENTS, perms::CREATE)?;

        let unlinked = self.segment_repo.unlink_offering(segment_id, offering_id)?;
        if unlinked {
            self.guard.audit(
                Some(actor_id),
                AuditAction::Update,
                AuditEntity::Segment,
                Some(segment_id),
                Some(json!({ "offering_unlinked": offering_id })),
            );
        }
        Ok(unlinked)
    }

    pub fn list_offerings_for_segment(&self, segment_id: &str) -> ApiResult<Vec<Offering>> {
        Ok(self.segment_repo.list_offerings_for_segment(segment_id)?)
    }

    pub fn list_segments_for_offering(&self, offering_id: &str) -> ApiResult<Vec<Segment>> {
        Ok(self.segment_repo.list_segments_for_offering(offering_id)?)
    }
}
