// ==========================================
// 线索管理后端 - 字段规范化
// ==========================================
// 职责: 公司名 / URL / 邮箱 / 自由文本的规范化，以及格式判定
// 红线: 规范化为纯函数，只规范化不拒绝；拒绝与否由调用方根据格式判定决定
// 说明: 去重键比较不走这里，去重使用 SQL 侧 lower(trim(..))
// ==========================================

use chrono::{Datelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// 成立年份下限
pub const MIN_FOUNDED_YEAR: i32 = 1800;

/// 公司名规范化：去首尾空白，内部连续空白折叠为单个空格
pub fn normalize_company_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// URL 规范化：去空白、小写，缺少 http(s) 协议时补 https://
///
/// 空串保持为空串
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim().to_lowercase();
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url
    } else {
        format!("https://{}", url)
    }
}

/// 邮箱规范化：去空白、小写
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 自由文本规范化：去空白，空串视为 NULL
pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==========================================
// FieldRule - 字段 → 规范化方式 映射表
// ==========================================
// 用于通用更新命令；未列出的字段按 Text 处理

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    CompanyName,
    Url,
    Email,
    Text,
}

impl Transform {
    /// 应用规范化；结果为空时返回 None
    pub fn apply(&self, raw: &str) -> Option<String> {
        let out = match self {
            Transform::CompanyName => normalize_company_name(raw),
            Transform::Url => normalize_url(raw),
            Transform::Email => normalize_email(raw),
            Transform::Text => return normalize_text(Some(raw)),
        };
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub transform: Transform,
}

const fn rule(field: &'static str, transform: Transform) -> FieldRule {
    FieldRule { field, transform }
}

pub const COMPANY_FIELD_RULES: &[FieldRule] = &[
    rule("name", Transform::CompanyName),
    rule("website", Transform::Url),
    rule("linkedin_url", Transform::Url),
];

pub const CONTACT_FIELD_RULES: &[FieldRule] = &[
    rule("email", Transform::Email),
    rule("email_2", Transform::Email),
    rule("linkedin_url", Transform::Url),
];

/// 查找字段对应的规范化方式
pub fn transform_for(rules: &[FieldRule], field: &str) -> Transform {
    rules
        .iter()
        .find(|r| r.field == field)
        .map(|r| r.transform)
        .unwrap_or(Transform::Text)
}

/// 按规则表规范化单个字段
pub fn normalize_field(rules: &[FieldRule], field: &str, raw: &str) -> Option<String> {
    transform_for(rules, field).apply(raw)
}

// ==========================================
// 格式判定
// ==========================================

fn re_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(https?://|[a-z0-9-]+\.[a-z]{2,})").expect("静态 URL 正则")
    })
}

fn re_email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("静态邮箱正则")
    })
}

/// 宽松 URL 判定：带 http(s) 协议，或以 `label.tld` 开头
pub fn is_valid_url(raw: &str) -> bool {
    re_url().is_match(raw.trim())
}

/// 邮箱形如 local@domain.tld
pub fn is_valid_email(raw: &str) -> bool {
    re_email().is_match(raw.trim())
}

/// 当前 UTC 年份
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// 成立年份是否落在 [1800, 当前年]
pub fn is_valid_founded_year(year: i32) -> bool {
    (MIN_FOUNDED_YEAR..=current_year()).contains(&year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("  Acme   Widgets \t Inc "), "Acme Widgets Inc");
        assert_eq!(normalize_company_name(""), "");
        assert_eq!(normalize_company_name("   "), "");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url(" Example.COM "), "https://example.com");
        assert_eq!(normalize_url("http://foo.io"), "http://foo.io");
        assert_eq!(normalize_url("HTTPS://Foo.io/Path"), "https://foo.io/path");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_normalize_email_and_text() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
        assert_eq!(normalize_text(Some("  VP Sales ")), Some("VP Sales".to_string()));
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_format_checks() {
        assert!(is_valid_url("https://acme.com"));
        assert!(is_valid_url("HTTP://x"));
        assert!(is_valid_url("acme-co.IO/about"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("ftp://acme.com"));

        assert!(is_valid_email("jane@acme.com"));
        assert!(!is_valid_email("jane@acme"));
        assert!(!is_valid_email("jane acme.com"));
        assert!(!is_valid_email("a@b@c.com"));

        assert!(is_valid_founded_year(1800));
        assert!(is_valid_founded_year(current_year()));
        assert!(!is_valid_founded_year(1799));
        assert!(!is_valid_founded_year(current_year() + 1));
    }

    #[test]
    fn test_field_rules() {
        assert_eq!(transform_for(COMPANY_FIELD_RULES, "website"), Transform::Url);
        assert_eq!(transform_for(COMPANY_FIELD_RULES, "industry"), Transform::Text);
        assert_eq!(transform_for(CONTACT_FIELD_RULES, "email_2"), Transform::Email);

        assert_eq!(
            normalize_field(COMPANY_FIELD_RULES, "name", " Big   Co "),
            Some("Big Co".to_string())
        );
        assert_eq!(normalize_field(CONTACT_FIELD_RULES, "job_title", "  "), None);
    }
}
