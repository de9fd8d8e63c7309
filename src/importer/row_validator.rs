// ==========================================
// 线索管理后端 - 行校验器
// ==========================================
// 职责: 单行原始数据 + 实体类型 → 实体草稿 或 字段错误列表
// 红线: 不 panic、不返回系统错误；所有问题都转为 FieldError
// 红线: 规则相互独立，一行内收集全部违反项；有任一错误则不产出草稿
// ==========================================

use crate::domain::company::{Company, NewCompany};
use crate::domain::contact::NewContact;
use crate::domain::segment::Segment;
use crate::domain::types::EntityType;
use crate::domain::upload::{EntityDraft, FieldError};
use crate::engine::normalizer::{
    current_year, is_valid_email, is_valid_founded_year, is_valid_url, normalize_company_name,
    normalize_email, normalize_text, normalize_url,
};
use crate::importer::file_parser::RawRow;
use crate::repository::error::RepositoryResult;
use crate::repository::{CompanyRepository, SegmentRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

// ===== 列名 =====
pub mod columns {
    pub const COMPANY_NAME: &str = "Company Name";
    pub const SEGMENT_NAME: &str = "Segment Name";
    pub const COMPANY_WEBSITE: &str = "Company Website";
    pub const FOUNDED_YEAR: &str = "Founded Year";
    pub const COMPANY_INDUSTRY: &str = "Company Industry";
    pub const COMPANY_DESCRIPTION: &str = "Company Description";
    pub const COMPANY_PHONE: &str = "Company Phone";
    pub const COMPANY_LINKEDIN_URL: &str = "Company LinkedIn URL";
    pub const COMPANY_CITY: &str = "Company City";
    pub const COMPANY_STATE: &str = "Company State";
    pub const COMPANY_COUNTRY: &str = "Company Country";

    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const EMAIL: &str = "Email";
    pub const JOB_TITLE: &str = "Job Title";
    pub const MOBILE_PHONE: &str = "Mobile Phone";
    pub const DIRECT_PHONE: &str = "Direct Phone";
    pub const LINKEDIN_URL: &str = "LinkedIn URL";
    pub const LEAD_SOURCE: &str = "Lead Source";
}

const REQUIRED: &str = "Required";

// ==========================================
// ReferenceLookup - 引用解析
// ==========================================
pub trait ReferenceLookup: Send + Sync {
    /// 按名称查找 active 细分
    fn find_active_segment_by_name(&self, name: &str) -> RepositoryResult<Option<Segment>>;

    /// 按名称查找 approved 公司
    fn find_approved_company_by_name(&self, name: &str) -> RepositoryResult<Option<Company>>;
}

/// 基于仓储的引用解析实现
pub struct RepositoryReferenceLookup {
    segments: Arc<SegmentRepository>,
    companies: Arc<CompanyRepository>,
}

impl RepositoryReferenceLookup {
    pub fn new(segments: Arc<SegmentRepository>, companies: Arc<CompanyRepository>) -> Self {
        Self {
            segments,
            companies,
        }
    }
}

impl ReferenceLookup for RepositoryReferenceLookup {
    fn find_active_segment_by_name(&self, name: &str) -> RepositoryResult<Option<Segment>> {
        self.segments.find_active_by_name(name)
    }

    /// 公司名先规范化再匹配（库内公司名均为规范化后的形式）
    fn find_approved_company_by_name(&self, name: &str) -> RepositoryResult<Option<Company>> {
        self.companies
            .find_approved_by_name(&normalize_company_name(name))
    }
}

// ==========================================
// DraftContext - 草稿隐式字段来源
// ==========================================
#[derive(Debug, Clone)]
pub struct DraftContext {
    pub batch_id: String,
    pub uploader_id: String,
    pub now: DateTime<Utc>,
}

// ==========================================
// RowValidator
// ==========================================
pub struct RowValidator<L: ReferenceLookup> {
    lookup: L,
}

impl<L: ReferenceLookup> RowValidator<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// 校验单行
    ///
    /// # 参数
    /// - `row`: 原始行（含行号）
    /// - `entity_type`: 公司 / 联系人
    /// - `ctx`: 批次与上传人
    ///
    /// # 返回
    /// - `Ok(draft)`: 规范化后的草稿
    /// - `Err(errors)`: 每条违反规则一条错误（非空）
    pub fn validate_row(
        &self,
        row: &RawRow,
        entity_type: EntityType,
        ctx: &DraftContext,
    ) -> Result<EntityDraft, Vec<FieldError>> {
        match entity_type {
            EntityType::Company => self.validate_company(row, ctx),
            EntityType::Contact => self.validate_contact(row, ctx),
        }
    }

    fn validate_company(
        &self,
        row: &RawRow,
        ctx: &DraftContext,
    ) -> Result<EntityDraft, Vec<FieldError>> {
        use columns::*;
        let n = row.row_number;
        let mut errors = Vec::new();

        let name = row.non_empty(COMPANY_NAME);
        if name.is_none() {
            errors.push(FieldError::new(n, COMPANY_NAME, row.get(COMPANY_NAME), REQUIRED));
        }

        let mut segment_id = None;
        match row.non_empty(SEGMENT_NAME) {
            None => errors.push(FieldError::new(n, SEGMENT_NAME, row.get(SEGMENT_NAME), REQUIRED)),
            Some(seg_name) => match self.lookup.find_active_segment_by_name(seg_name) {
                Ok(Some(seg)) => segment_id = Some(seg.id),
                Ok(None) => errors.push(FieldError::new(
                    n,
                    SEGMENT_NAME,
                    Some(seg_name),
                    format!("Active segment '{}' not found", seg_name),
                )),
                Err(e) => {
                    warn!(row = n, error = %e, "细分查询失败");
                    errors.push(FieldError::new(
                        n,
                        SEGMENT_NAME,
                        Some(seg_name),
                        format!("Lookup failed for segment '{}'", seg_name),
                    ));
                }
            },
        }

        let website = row.non_empty(COMPANY_WEBSITE);
        if let Some(url) = website {
            if !is_valid_url(url) {
                errors.push(FieldError::new(n, COMPANY_WEBSITE, Some(url), "Invalid URL"));
            }
        }

        let mut founded_year = None;
        if let Some(raw_year) = row.non_empty(FOUNDED_YEAR) {
            match raw_year.parse::<i32>() {
                Ok(y) if is_valid_founded_year(y) => founded_year = Some(y),
                _ => errors.push(FieldError::new(
                    n,
                    FOUNDED_YEAR,
                    Some(raw_year),
                    format!("Invalid year (1800-{})", current_year()),
                )),
            }
        }

        let (Some(name), Some(segment_id), true) = (name, segment_id, errors.is_empty()) else {
            return Err(errors);
        };

        let draft = NewCompany {
            name: normalize_company_name(name),
            segment_id,
            website: website.map(normalize_url),
            phone: normalize_text(row.get(COMPANY_PHONE)),
            description: normalize_text(row.get(COMPANY_DESCRIPTION)),
            linkedin_url: row.non_empty(COMPANY_LINKEDIN_URL).map(normalize_url),
            industry: normalize_text(row.get(COMPANY_INDUSTRY)),
            address_city: normalize_text(row.get(COMPANY_CITY)),
            address_state: normalize_text(row.get(COMPANY_STATE)),
            address_country: normalize_text(row.get(COMPANY_COUNTRY)),
            founded_year,
            ..Default::default()
        }
        .into_draft(&ctx.uploader_id, Some(&ctx.batch_id), ctx.now);

        Ok(EntityDraft::Company(draft))
    }

    fn validate_contact(
        &self,
        row: &RawRow,
        ctx: &DraftContext,
    ) -> Result<EntityDraft, Vec<FieldError>> {
        use columns::*;
        let n = row.row_number;
        let mut errors = Vec::new();

        let first_name = row.non_empty(FIRST_NAME);
        if first_name.is_none() {
            errors.push(FieldError::new(n, FIRST_NAME, row.get(FIRST_NAME), REQUIRED));
        }
        let last_name = row.non_empty(LAST_NAME);
        if last_name.is_none() {
            errors.push(FieldError::new(n, LAST_NAME, row.get(LAST_NAME), REQUIRED));
        }

        let email = row.non_empty(EMAIL);
        match email {
            None => errors.push(FieldError::new(n, EMAIL, row.get(EMAIL), REQUIRED)),
            Some(e) if !is_valid_email(e) => {
                errors.push(FieldError::new(n, EMAIL, Some(e), "Invalid email format"))
            }
            Some(_) => {}
        }

        let mut company = None;
        match row.non_empty(COMPANY_NAME) {
            None => errors.push(FieldError::new(n, COMPANY_NAME, row.get(COMPANY_NAME), REQUIRED)),
            Some(cname) => match self.lookup.find_approved_company_by_name(cname) {
                Ok(Some(c)) => company = Some(c),
                Ok(None) => errors.push(FieldError::new(
                    n,
                    COMPANY_NAME,
                    Some(cname),
                    format!("Approved company '{}' not found", cname),
                )),
                Err(e) => {
                    warn!(row = n, error = %e, "公司查询失败");
                    errors.push(FieldError::new(
                        n,
                        COMPANY_NAME,
                        Some(cname),
                        format!("Lookup failed for company '{}'", cname),
                    ));
                }
            },
        }

        let (Some(first_name), Some(last_name), Some(email), Some(company), true) =
            (first_name, last_name, email, company, errors.is_empty())
        else {
            return Err(errors);
        };

        let draft = NewContact {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: normalize_email(email),
            company_id: company.id.clone(),
            job_title: normalize_text(row.get(JOB_TITLE)),
            mobile_phone: normalize_text(row.get(MOBILE_PHONE)),
            direct_phone: normalize_text(row.get(DIRECT_PHONE)),
            linkedin_url: row.non_empty(LINKEDIN_URL).map(normalize_url),
            lead_source: normalize_text(row.get(LEAD_SOURCE)),
            ..Default::default()
        }
        .into_draft(&company, &ctx.uploader_id, Some(&ctx.batch_id), ctx.now);

        Ok(EntityDraft::Contact(draft))
    }
}
