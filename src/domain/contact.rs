// ==========================================
// 线索管理后端 - 联系人领域模型
// ==========================================
// 对齐: v0.1_init.sql contacts 表
// 红线: segment_id 创建时从公司复制，调用方不可指定
// 红线: assigned_sdr_id 非空 当且仅当 status ∈ {assigned_to_sdr, meeting_scheduled}
// ==========================================

use crate::domain::company::Company;
use crate::domain::types::ContactStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Contact - 联系人
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,

    // ===== 基础信息 =====
    pub first_name: String,
    pub last_name: String,
    pub email: String,           // 已规范化（小写）
    pub email_2: Option<String>,
    pub mobile_phone: Option<String>,
    pub direct_phone: Option<String>,
    pub job_title: Option<String>,
    pub lead_source: Option<String>,
    pub management_level: Option<String>,

    // ===== 地址 =====
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    pub primary_timezone: Option<String>,

    // ===== 社交 =====
    pub linkedin_url: Option<String>,
    pub linkedin_summary: Option<String>,

    // ===== 归属 / 生命周期 =====
    pub company_id: String,
    pub segment_id: String, // 来自公司
    pub status: ContactStatus,
    pub assigned_sdr_id: Option<String>,
    pub is_duplicate: bool,
    pub is_active: bool,

    // ===== 来源 / 审计 =====
    pub batch_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewContact - 创建命令
// ==========================================
// 不含 segment_id，创建时由公司决定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_id: String,
    pub email_2: Option<String>,
    pub mobile_phone: Option<String>,
    pub direct_phone: Option<String>,
    pub job_title: Option<String>,
    pub lead_source: Option<String>,
    pub management_level: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    pub primary_timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub linkedin_summary: Option<String>,
}

impl NewContact {
    /// 生成待落库的联系人草稿
    ///
    /// # 参数
    /// - `company`: 已确认为 approved 的公司（segment_id 从这里复制）
    pub fn into_draft(
        self,
        company: &Company,
        created_by: &str,
        batch_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Contact {
        Contact {
            id: Uuid::new_v4().to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            email_2: self.email_2,
            mobile_phone: self.mobile_phone,
            direct_phone: self.direct_phone,
            job_title: self.job_title,
            lead_source: self.lead_source,
            management_level: self.management_level,
            address_street: self.address_street,
            address_city: self.address_city,
            address_state: self.address_state,
            address_country: self.address_country,
            address_zip: self.address_zip,
            primary_timezone: self.primary_timezone,
            linkedin_url: self.linkedin_url,
            linkedin_summary: self.linkedin_summary,
            company_id: company.id.clone(),
            segment_id: company.segment_id.clone(),
            status: ContactStatus::Uploaded,
            assigned_sdr_id: None,
            is_duplicate: false,
            is_active: true,
            batch_id: batch_id.map(str::to_string),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// ContactUpdate - 通用更新命令
// ==========================================
// company_id / segment_id / status 不可经由更新修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_2: Option<String>,
    pub mobile_phone: Option<String>,
    pub direct_phone: Option<String>,
    pub job_title: Option<String>,
    pub lead_source: Option<String>,
    pub management_level: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    pub primary_timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub linkedin_summary: Option<String>,
}

impl From<&NewContact> for ContactUpdate {
    fn from(c: &NewContact) -> Self {
        Self {
            first_name: Some(c.first_name.clone()),
            last_name: Some(c.last_name.clone()),
            email: Some(c.email.clone()),
            email_2: c.email_2.clone(),
            mobile_phone: c.mobile_phone.clone(),
            direct_phone: c.direct_phone.clone(),
            job_title: c.job_title.clone(),
            lead_source: c.lead_source.clone(),
            management_level: c.management_level.clone(),
            address_street: c.address_street.clone(),
            address_city: c.address_city.clone(),
            address_state: c.address_state.clone(),
            address_country: c.address_country.clone(),
            address_zip: c.address_zip.clone(),
            primary_timezone: c.primary_timezone.clone(),
            linkedin_url: c.linkedin_url.clone(),
            linkedin_summary: c.linkedin_summary.clone(),
        }
    }
}
