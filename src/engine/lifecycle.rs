// ==========================================
// 线索管理后端 - 实体生命周期规则
// ==========================================
// 职责: 公司/联系人状态机判定、通用更新命令的字段应用
// 红线: 纯规则，不访问存储；持久化由 API 层配合仓储完成
// ==========================================
// 公司:   pending --approve--> approved
//         pending --reject(reason)--> rejected
// 联系人: uploaded --approve--> approved --assign--> assigned_to_sdr --schedule--> meeting_scheduled
// ==========================================

use crate::domain::audit::FieldChange;
use crate::domain::company::{Company, CompanyUpdate};
use crate::domain::contact::{Contact, ContactUpdate};
use crate::domain::types::{CompanyStatus, ContactStatus};
use crate::engine::normalizer::{
    current_year, is_valid_email, is_valid_founded_year, is_valid_url, normalize_field,
    COMPANY_FIELD_RULES, CONTACT_FIELD_RULES,
};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

// ==========================================
// LifecycleError - 规则违反
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidTransition { from: String, to: String },

    #[error("{field}: Required")]
    Required { field: &'static str },

    #[error("{field}: Invalid email format")]
    InvalidEmail { field: &'static str },

    #[error("{field}: Invalid URL")]
    InvalidUrl { field: &'static str },

    #[error("{field}: Invalid year (1800-{max})")]
    InvalidYear { field: &'static str, max: i32 },
}

// ==========================================
// 状态机判定
// ==========================================

/// 公司审批/拒绝：只允许从 pending 出发，且目标只能是 approved / rejected
pub fn check_company_transition(
    current: CompanyStatus,
    target: CompanyStatus,
) -> Result<(), LifecycleError> {
    let allowed = current == CompanyStatus::Pending
        && matches!(target, CompanyStatus::Approved | CompanyStatus::Rejected);
    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            from: current.to_string(),
            to: target.to_string(),
        })
    }
}

/// 联系人推进：目标必须恰为当前状态的下一个
pub fn check_contact_transition(
    current: ContactStatus,
    target: ContactStatus,
) -> Result<(), LifecycleError> {
    if current.next() == Some(target) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            from: current.to_string(),
            to: target.to_string(),
        })
    }
}

/// 拒绝原因：去空白后非空；返回原样（不裁剪）的原因
pub fn check_rejection_reason(reason: &str) -> Result<&str, LifecycleError> {
    if reason.trim().is_empty() {
        Err(LifecycleError::Required {
            field: "rejection_reason",
        })
    } else {
        Ok(reason)
    }
}

// ==========================================
// 通用更新
// ==========================================

/// 可选文本字段：Some(raw) 时按规则规范化，值变化才记录
fn apply_optional(
    changes: &mut Vec<FieldChange>,
    rules: &[crate::engine::normalizer::FieldRule],
    field: &'static str,
    target: &mut Option<String>,
    incoming: &Option<String>,
) {
    let Some(raw) = incoming else {
        return;
    };
    let next = normalize_field(rules, field, raw);
    if *target != next {
        changes.push(FieldChange {
            field,
            old: json!(target),
            new: json!(next),
        });
        *target = next;
    }
}

/// 必填文本字段：规范化后为空视为 Required
fn apply_required(
    changes: &mut Vec<FieldChange>,
    rules: &[crate::engine::normalizer::FieldRule],
    field: &'static str,
    target: &mut String,
    incoming: &Option<String>,
) -> Result<(), LifecycleError> {
    let Some(raw) = incoming else {
        return Ok(());
    };
    let next = normalize_field(rules, field, raw).ok_or(LifecycleError::Required { field })?;
    if *target != next {
        changes.push(FieldChange {
            field,
            old: JsonValue::String(target.clone()),
            new: JsonValue::String(next.clone()),
        });
        *target = next;
    }
    Ok(())
}

/// 将更新命令应用到公司（原地修改），返回字段变更明细
///
/// # 说明
/// - segment_id 是否指向 active 细分由调用方校验
/// - 任一字段不合法时返回错误，此时 `company` 可能已部分修改，调用方应丢弃
pub fn apply_company_update(
    company: &mut Company,
    update: &CompanyUpdate,
) -> Result<Vec<FieldChange>, LifecycleError> {
    let rules = COMPANY_FIELD_RULES;
    let mut changes = Vec::new();

    apply_required(&mut changes, rules, "name", &mut company.name, &update.name)?;

    if let Some(segment_id) = &update.segment_id {
        let next = segment_id.trim();
        if next.is_empty() {
            return Err(LifecycleError::Required { field: "segment_id" });
        }
        if company.segment_id != next {
            changes.push(FieldChange {
                field: "segment_id",
                old: json!(company.segment_id),
                new: json!(next),
            });
            company.segment_id = next.to_string();
        }
    }

    for (field, raw) in [("website", &update.website), ("linkedin_url", &update.linkedin_url)] {
        if let Some(raw) = raw {
            if !raw.trim().is_empty() && !is_valid_url(raw) {
                return Err(LifecycleError::InvalidUrl { field });
            }
        }
    }
    apply_optional(&mut changes, rules, "website", &mut company.website, &update.website);
    apply_optional(&mut changes, rules, "phone", &mut company.phone, &update.phone);
    apply_optional(&mut changes, rules, "description", &mut company.description, &update.description);
    apply_optional(&mut changes, rules, "linkedin_url", &mut company.linkedin_url, &update.linkedin_url);
    apply_optional(&mut changes, rules, "industry", &mut company.industry, &update.industry);
    apply_optional(&mut changes, rules, "sub_industry", &mut company.sub_industry, &update.sub_industry);
    apply_optional(&mut changes, rules, "address_street", &mut company.address_street, &update.address_street);
    apply_optional(&mut changes, rules, "address_city", &mut company.address_city, &update.address_city);
    apply_optional(&mut changes, rules, "address_state", &mut company.address_state, &update.address_state);
    apply_optional(&mut changes, rules, "address_country", &mut company.address_country, &update.address_country);
    apply_optional(&mut changes, rules, "address_zip", &mut company.address_zip, &update.address_zip);
    apply_optional(&mut changes, rules, "revenue_range", &mut company.revenue_range, &update.revenue_range);
    apply_optional(
        &mut changes,
        rules,
        "employee_size_range",
        &mut company.employee_size_range,
        &update.employee_size_range,
    );

    if let Some(year) = update.founded_year {
        if !is_valid_founded_year(year) {
            return Err(LifecycleError::InvalidYear {
                field: "founded_year",
                max: current_year(),
            });
        }
        if company.founded_year != Some(year) {
            changes.push(FieldChange {
                field: "founded_year",
                old: json!(company.founded_year),
                new: json!(year),
            });
            company.founded_year = Some(year);
        }
    }

    Ok(changes)
}

/// 将更新命令应用到联系人（原地修改），返回字段变更明细
pub fn apply_contact_update(
    contact: &mut Contact,
    update: &ContactUpdate,
) -> Result<Vec<FieldChange>, LifecycleError> {
    let rules = CONTACT_FIELD_RULES;
    let mut changes = Vec::new();

    apply_required(&mut changes, rules, "first_name", &mut contact.first_name, &update.first_name)?;
    apply_required(&mut changes, rules, "last_name", &mut contact.last_name, &update.last_name)?;

    if let Some(raw) = &update.email {
        if !raw.trim().is_empty() && !is_valid_email(raw) {
            return Err(LifecycleError::InvalidEmail { field: "email" });
        }
    }
    apply_required(&mut changes, rules, "email", &mut contact.email, &update.email)?;

    if let Some(raw) = &update.email_2 {
        if !raw.trim().is_empty() && !is_valid_email(raw) {
            return Err(LifecycleError::InvalidEmail { field: "email_2" });
        }
    }
    if let Some(raw) = &update.linkedin_url {
        if !raw.trim().is_empty() && !is_valid_url(raw) {
            return Err(LifecycleError::InvalidUrl { field: "linkedin_url" });
        }
    }

    apply_optional(&mut changes, rules, "email_2", &mut contact.email_2, &update.email_2);
    apply_optional(&mut changes, rules, "mobile_phone", &mut contact.mobile_phone, &update.mobile_phone);
    apply_optional(&mut changes, rules, "direct_phone", &mut contact.direct_phone, &update.direct_phone);
    apply_optional(&mut changes, rules, "job_title", &mut contact.job_title, &update.job_title);
    apply_optional(&mut changes, rules, "lead_source", &mut contact.lead_source, &update.lead_source);
    apply_optional(
        &mut changes,
        rules,
        "management_level",
        &mut contact.management_level,
        &update.management_level,
    );
    apply_optional(&mut changes, rules, "address_street", &mut contact.address_street, &update.address_street);
    apply_optional(&mut changes, rules, "address_city", &mut contact.address_city, &update.address_city);
    apply_optional(&mut changes, rules, "address_state", &mut contact.address_state, &update.address_state);
    apply_optional(&mut changes, rules, "address_country", &mut contact.address_country, &update.address_country);
    apply_optional(&mut changes, rules, "address_zip", &mut contact.address_zip, &update.address_zip);
    apply_optional(
        &mut changes,
        rules,
        "primary_timezone",
        &mut contact.primary_timezone,
        &update.primary_timezone,
    );
    apply_optional(&mut changes, rules, "linkedin_url", &mut contact.linkedin_url, &update.linkedin_url);
    apply_optional(
        &mut changes,
        rules,
        "linkedin_summary",
        &mut contact.linkedin_summary,
        &update.linkedin_summary,
    );

    Ok(changes)
}
