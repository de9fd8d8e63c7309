// ==========================================
// 线索管理后端 - 联系人数据仓储
// ==========================================
// 对齐: contacts 表
// 红线: 每个推进操作都是单条带状态守卫的 UPDATE
// 红线: 批量审批为一条集合式 UPDATE，只作用于当前处于 uploaded 的记录
// ==========================================

use crate::domain::contact::Contact;
use crate::domain::types::{format_ts, parse_ts, ContactStatus};
use crate::repository::decode_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const CONTACT_COLUMNS: &str = r#"
    id, first_name, last_name, email, email_2, mobile_phone, direct_phone, job_title,
    lead_source, management_level, address_street, address_city, address_state,
    address_country, address_zip, primary_timezone, linkedin_url, linkedin_summary,
    company_id, segment_id, status, assigned_sdr_id, is_duplicate, is_active,
    batch_id, created_by, created_at, updated_at
"#;

pub struct ContactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContactRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert(&self, contact: &Contact) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_contact(&conn, contact)?;
        Ok(())
    }

    /// 单条审批: uploaded → approved
    pub fn approve(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE contacts SET status = 'approved', updated_at = ?1 WHERE id = ?2 AND status = 'uploaded'",
            params![format_ts(&now), id],
        )?;
        Ok(rows)
    }

    /// 批量审批
    ///
    /// # 返回
    /// 实际被审批的 id（不在 uploaded 的 id 静默跳过）
    pub fn bulk_approve(&self, ids: &[String], now: DateTime<Utc>) -> RepositoryResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;

        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            UPDATE contacts SET status = 'approved', updated_at = ?1
            WHERE status = 'uploaded' AND id IN ({})
            RETURNING id
            "#,
            placeholders
        );

        let mut values: Vec<SqlValue> = Vec::with_capacity(ids.len() + 1);
        values.push(SqlValue::Text(format_ts(&now)));
        values.extend(ids.iter().map(|id| SqlValue::Text(id.clone())));

        let mut stmt = conn.prepare(&sql)?;
        let approved = stmt
            .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(approved)
    }

    /// 分配 SDR: approved → assigned_to_sdr（状态与 SDR 同一语句写入）
    pub fn assign_sdr(&self, id: &str, sdr_id: &str, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE contacts SET status = 'assigned_to_sdr', assigned_sdr_id = ?1, updated_at = ?2
            WHERE id = ?3 AND status = 'approved'
            "#,
            params![sdr_id, format_ts(&now), id],
        )?;
        Ok(rows)
    }

    /// 安排会议: assigned_to_sdr → meeting_scheduled
    pub fn schedule_meeting(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE contacts SET status = 'meeting_scheduled', updated_at = ?1 WHERE id = ?2 AND status = 'assigned_to_sdr'",
            params![format_ts(&now), id],
        )?;
        Ok(rows)
    }

    /// 写回可编辑字段（通用更新；归属与状态不在此列）
    pub fn update_fields(&self, c: &Contact) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE contacts SET
                first_name = ?1, last_name = ?2, email = ?3, email_2 = ?4,
                mobile_phone = ?5, direct_phone = ?6, job_title = ?7, lead_source = ?8,
                management_level = ?9, address_street = ?10, address_city = ?11,
                address_state = ?12, address_country = ?13, address_zip = ?14,
                primary_timezone = ?15, linkedin_url = ?16, linkedin_summary = ?17,
                updated_at = ?18
            WHERE id = ?19
            "#,
            params![
                c.first_name,
                c.last_name,
                c.email,
                c.email_2,
                c.mobile_phone,
                c.direct_phone,
                c.job_title,
                c.lead_source,
                c.management_level,
                c.address_street,
                c.address_city,
                c.address_state,
                c.address_country,
                c.address_zip,
                c.primary_timezone,
                c.linkedin_url,
                c.linkedin_summary,
                format_ts(&c.updated_at),
                c.id,
            ],
        )?;
        Ok(rows)
    }

    /// 软删除
    pub fn deactivate(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE contacts SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![format_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM contacts WHERE id = ?1", CONTACT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], map_contact) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contacts WHERE batch_id = ?1 ORDER BY created_at ASC, id ASC",
            CONTACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![batch_id], map_contact)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_company(&self, company_id: &str) -> RepositoryResult<Vec<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contacts WHERE company_id = ?1 ORDER BY created_at ASC, id ASC",
            CONTACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![company_id], map_contact)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按状态列出分配给某 SDR 的联系人
    pub fn list_by_sdr(&self, sdr_id: &str) -> RepositoryResult<Vec<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contacts WHERE assigned_sdr_id = ?1 ORDER BY updated_at DESC",
            CONTACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![sdr_id], map_contact)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 插入单条联系人记录（供事务内批量落库复用）
pub(crate) fn insert_contact(conn: &Connection, c: &Contact) -> SqliteResult<usize> {
    let placeholders = (1..=28)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO contacts ({}) VALUES ({})",
        CONTACT_COLUMNS, placeholders
    );
    conn.execute(
        &sql,
        params![
            c.id,
            c.first_name,
            c.last_name,
            c.email,
            c.email_2,
            c.mobile_phone,
            c.direct_phone,
            c.job_title,
            c.lead_source,
            c.management_level,
            c.address_street,
            c.address_city,
            c.address_state,
            c.address_country,
            c.address_zip,
            c.primary_timezone,
            c.linkedin_url,
            c.linkedin_summary,
            c.company_id,
            c.segment_id,
            c.status.as_str(),
            c.assigned_sdr_id,
            c.is_duplicate,
            c.is_active,
            c.batch_id,
            c.created_by,
            format_ts(&c.created_at),
            format_ts(&c.updated_at),
        ],
    )
}

fn map_contact(row: &Row) -> SqliteResult<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        email_2: row.get(4)?,
        mobile_phone: row.get(5)?,
        direct_phone: row.get(6)?,
        job_title: row.get(7)?,
        lead_source: row.get(8)?,
        management_level: row.get(9)?,
        address_street: row.get(10)?,
        address_city: row.get(11)?,
        address_state: row.get(12)?,
        address_country: row.get(13)?,
        address_zip: row.get(14)?,
        primary_timezone: row.get(15)?,
        linkedin_url: row.get(16)?,
        linkedin_summary: row.get(17)?,
        company_id: row.get(18)?,
        segment_id: row.get(19)?,
        status: decode_enum(20, row.get(20)?, ContactStatus::from_db_str)?,
        assigned_sdr_id: row.get(21)?,
        is_duplicate: row.get(22)?,
        is_active: row.get(23)?,
        batch_id: row.get(24)?,
        created_by: row.get(25)?,
        created_at: parse_ts(&row.get::<_, String>(26)?),
        updated_at: parse_ts(&row.get::<_, String>(27)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    const TS: &str = "2026-01-01T00:00:00.000000Z";

    fn setup() -> ContactRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(&format!(
            r#"
            INSERT INTO users (id, email, name, is_active, created_at) VALUES
                ('u1', 'r@x.io', 'Researcher', 1, '{ts}'),
                ('sdr', 's@x.io', 'SDR', 1, '{ts}');
            INSERT INTO segments (id, name, status, created_by, created_at, updated_at)
            VALUES ('s1', 'Fintech', 'active', 'u1', '{ts}', '{ts}');
            INSERT INTO companies (id, name, segment_id, status, created_by, created_at, updated_at)
            VALUES ('c1', 'Acme', 's1', 'approved', 'u1', '{ts}', '{ts}');
            "#,
            ts = TS
        ))
        .unwrap();
        ContactRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn contact(id: &str, email: &str) -> Contact {
        let now = Utc::now();
        Contact {
            id: id.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            email_2: None,
            mobile_phone: None,
            direct_phone: None,
            job_title: None,
            lead_source: None,
            management_level: None,
            address_street: None,
            address_city: None,
            address_state: None,
            address_country: None,
            address_zip: None,
            primary_timezone: None,
            linkedin_url: None,
            linkedin_summary: None,
            company_id: "c1".to_string(),
            segment_id: "s1".to_string(),
            status: ContactStatus::Uploaded,
            assigned_sdr_id: None,
            is_duplicate: false,
            is_active: true,
            batch_id: None,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bulk_approve_skips_non_uploaded() {
        let repo = setup();
        repo.insert(&contact("k1", "a@acme.com")).unwrap();
        repo.insert(&contact("k2", "b@acme.com")).unwrap();
        repo.insert(&contact("k3", "c@acme.com")).unwrap();
        assert_eq!(repo.approve("k3", Utc::now()).unwrap(), 1);

        let ids = vec![
            "k1".to_string(),
            "k2".to_string(),
            "k3".to_string(),
            "missing".to_string(),
        ];
        let mut approved = repo.bulk_approve(&ids, Utc::now()).unwrap();
        approved.sort();
        assert_eq!(approved, vec!["k1".to_string(), "k2".to_string()]);

        for id in ["k1", "k2", "k3"] {
            assert_eq!(
                repo.find_by_id(id).unwrap().unwrap().status,
                ContactStatus::Approved
            );
        }
    }

    #[test]
    fn test_guarded_progression() {
        let repo = setup();
        repo.insert(&contact("k1", "a@acme.com")).unwrap();

        // 未审批不可分配
        assert_eq!(repo.assign_sdr("k1", "sdr", Utc::now()).unwrap(), 0);
        assert_eq!(repo.schedule_meeting("k1", Utc::now()).unwrap(), 0);

        assert_eq!(repo.approve("k1", Utc::now()).unwrap(), 1);
        assert_eq!(repo.assign_sdr("k1", "sdr", Utc::now()).unwrap(), 1);
        assert_eq!(repo.assign_sdr("k1", "sdr", Utc::now()).unwrap(), 0);
        assert_eq!(repo.schedule_meeting("k1", Utc::now()).unwrap(), 1);

        let stored = repo.find_by_id("k1").unwrap().unwrap();
        assert_eq!(stored.status, ContactStatus::MeetingScheduled);
        assert_eq!(stored.assigned_sdr_id.as_deref(), Some("sdr"));
        assert_eq!(repo.list_by_sdr("sdr").unwrap().len(), 1);
    }

    #[test]
    fn test_sdr_invariant_enforced_by_schema() {
        let repo = setup();
        let mut bad = contact("k9", "z@acme.com");
        bad.status = ContactStatus::AssignedToSdr;
        let err = repo.insert(&bad).unwrap_err();
        assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));
    }
}
