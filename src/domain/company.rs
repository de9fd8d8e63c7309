// ==========================================
// 线索管理后端 - 公司领域模型
// ==========================================
// 对齐: v0.1_init.sql companies 表
// 红线: rejection_reason 非空 当且仅当 status = rejected
// 红线: 不做物理删除，is_active 为软删除标记
// ==========================================

use crate::domain::types::CompanyStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Company - 公司
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    // ===== 主键 =====
    pub id: String,

    // ===== 基础信息 =====
    pub name: String,                    // 已规范化（去首尾空白、折叠空白）
    pub website: Option<String>,         // 已规范化 URL
    pub phone: Option<String>,
    pub description: Option<String>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub sub_industry: Option<String>,

    // ===== 地址 =====
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,

    // ===== 规模 =====
    pub founded_year: Option<i32>,
    pub revenue_range: Option<String>,
    pub employee_size_range: Option<String>,

    // ===== 生命周期 =====
    pub segment_id: String,
    pub status: CompanyStatus,
    pub rejection_reason: Option<String>,
    pub is_duplicate: bool,
    pub is_active: bool,

    // ===== 来源 / 审计 =====
    pub batch_id: Option<String>, // 手工创建时为 None
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewCompany - 创建命令
// ==========================================
// 调用方在落库前负责规范化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub segment_id: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub sub_industry: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    pub founded_year: Option<i32>,
    pub revenue_range: Option<String>,
    pub employee_size_range: Option<String>,
}

impl NewCompany {
    /// 生成待落库的公司草稿（状态 pending，活跃，非重复）
    pub fn into_draft(
        self,
        created_by: &str,
        batch_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Company {
        Company {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            website: self.website,
            phone: self.phone,
            description: self.description,
            linkedin_url: self.linkedin_url,
            industry: self.industry,
            sub_industry: self.sub_industry,
            address_street: self.address_street,
            address_city: self.address_city,
            address_state: self.address_state,
            address_country: self.address_country,
            address_zip: self.address_zip,
            founded_year: self.founded_year,
            revenue_range: self.revenue_range,
            employee_size_range: self.employee_size_range,
            segment_id: self.segment_id,
            status: CompanyStatus::Pending,
            rejection_reason: None,
            is_duplicate: false,
            is_active: true,
            batch_id: batch_id.map(str::to_string),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&NewCompany> for CompanyUpdate {
    /// 创建命令视为对空白草稿的一次全字段更新（复用同一套规范化与校验）
    fn from(c: &NewCompany) -> Self {
        Self {
            name: Some(c.name.clone()),
            segment_id: Some(c.segment_id.clone()),
            website: c.website.clone(),
            phone: c.phone.clone(),
            description: c.description.clone(),
            linkedin_url: c.linkedin_url.clone(),
            industry: c.industry.clone(),
            sub_industry: c.sub_industry.clone(),
            address_street: c.address_street.clone(),
            address_city: c.address_city.clone(),
            address_state: c.address_state.clone(),
            address_country: c.address_country.clone(),
            address_zip: c.address_zip.clone(),
            founded_year: c.founded_year,
            revenue_range: c.revenue_range.clone(),
            employee_size_range: c.employee_size_range.clone(),
        }
    }
}

// ==========================================
// CompanyUpdate - 通用更新命令
// ==========================================
// None 表示不修改；文本字段传空白串表示清空
// 状态/拒绝原因/重复标记不经由此命令修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub segment_id: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub linkedin_url: Option<String>,
    pub industry: Option<String>,
    pub sub_industry: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    pub founded_year: Option<i32>,
    pub revenue_range: Option<String>,
    pub employee_size_range: Option<String>,
}
