// ==========================================
// 线索管理后端 - 领域类型定义
// ==========================================
// 状态枚举统一以小写蛇形字符串落库（与对外接口一致）
// ==========================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 实体类型 (Entity Type)
// ==========================================
// 用途: 上传批次类型 / 审计日志 entity_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Company,
    Contact,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Contact => "contact",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "company" => Some(EntityType::Company),
            "contact" => Some(EntityType::Contact),
            _ => None,
        }
    }

    /// CSV 必填表头（大小写不敏感匹配）
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            EntityType::Company => &["Company Name", "Segment Name"],
            EntityType::Contact => &["First Name", "Last Name", "Company Name", "Email"],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 细分状态 (Segment Status)
// ==========================================
// 只在 active/archived 间切换，不做物理删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Active,
    Archived,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Active => "active",
            SegmentStatus::Archived => "archived",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SegmentStatus::Active),
            "archived" => Some(SegmentStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 公司状态 (Company Status)
// ==========================================
// pending → approved | rejected，一次性转换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Rejected,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Pending => "pending",
            CompanyStatus::Approved => "approved",
            CompanyStatus::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CompanyStatus::Pending),
            "approved" => Some(CompanyStatus::Approved),
            "rejected" => Some(CompanyStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 联系人状态 (Contact Status)
// ==========================================
// 严格线性推进: uploaded → approved → assigned_to_sdr → meeting_scheduled
// 派生 Ord 即推进顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Uploaded,
    Approved,
    AssignedToSdr,
    MeetingScheduled,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Uploaded => "uploaded",
            ContactStatus::Approved => "approved",
            ContactStatus::AssignedToSdr => "assigned_to_sdr",
            ContactStatus::MeetingScheduled => "meeting_scheduled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(ContactStatus::Uploaded),
            "approved" => Some(ContactStatus::Approved),
            "assigned_to_sdr" => Some(ContactStatus::AssignedToSdr),
            "meeting_scheduled" => Some(ContactStatus::MeetingScheduled),
            _ => None,
        }
    }

    /// 序列中的下一个状态（终态返回 None）
    pub fn next(&self) -> Option<ContactStatus> {
        match self {
            ContactStatus::Uploaded => Some(ContactStatus::Approved),
            ContactStatus::Approved => Some(ContactStatus::AssignedToSdr),
            ContactStatus::AssignedToSdr => Some(ContactStatus::MeetingScheduled),
            ContactStatus::MeetingScheduled => None,
        }
    }

    /// 该状态下 assigned_sdr 是否必须非空
    pub fn requires_sdr(&self) -> bool {
        matches!(
            self,
            ContactStatus::AssignedToSdr | ContactStatus::MeetingScheduled
        )
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 时间戳格式
// ==========================================
// 定长微秒 + Z 后缀，保证字符串排序与时间排序一致（去重分区排序依赖此性质）

/// 格式化为落库字符串
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 解析落库字符串（非法值回退为 UNIX_EPOCH）
pub fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_contact_status_progression() {
        assert_eq!(ContactStatus::Uploaded.next(), Some(ContactStatus::Approved));
        assert_eq!(
            ContactStatus::AssignedToSdr.next(),
            Some(ContactStatus::MeetingScheduled)
        );
        assert_eq!(ContactStatus::MeetingScheduled.next(), None);
        assert!(ContactStatus::Uploaded < ContactStatus::MeetingScheduled);
    }

    #[test]
    fn test_status_db_strings() {
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(CompanyStatus::from_db_str(s).unwrap().as_str(), s);
        }
        assert_eq!(
            ContactStatus::from_db_str("assigned_to_sdr"),
            Some(ContactStatus::AssignedToSdr)
        );
        assert_eq!(EntityType::from_db_str("lead"), None);
    }

    #[test]
    fn test_timestamp_format_sorts_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        let c = a + chrono::Duration::minutes(1);

        let (fa, fb, fc) = (format_ts(&a), format_ts(&b), format_ts(&c));
        assert!(fa < fb && fb < fc);
        assert_eq!(parse_ts(&fb), b);
    }
}
