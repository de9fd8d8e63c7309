// ==========================================
// 线索管理后端 - 公司数据仓储
// ==========================================
// 对齐: companies 表
// 红线: 状态转换 UPDATE 带 `WHERE status = 'pending'` 守卫，
//       影响行数为 0 即视为并发变更/非法转换，由 API 层判定
// ==========================================

use crate::domain::company::Company;
use crate::domain::types::{format_ts, parse_ts, CompanyStatus};
use crate::repository::decode_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const COMPANY_COLUMNS: &str = r#"
    id, name, website, phone, description, linkedin_url, industry, sub_industry,
    address_street, address_city, address_state, address_country, address_zip,
    founded_year, revenue_range, employee_size_range,
    segment_id, status, rejection_reason, is_duplicate, is_active,
    batch_id, created_by, created_at, updated_at
"#;

pub struct CompanyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompanyRepository {
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

    pub fn insert(&self, company: &Company) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_company(&conn, company)?;
        Ok(())
    }

    /// 审批/拒绝（仅 pending 可转换）
    ///
    /// # 返回
    /// - `Ok(1)`: 转换成功
    /// - `Ok(0)`: 记录不存在或已不在 pending
    pub fn decide(
        &self,
        id: &str,
        target: CompanyStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE companies
            SET status = ?1, rejection_reason = ?2, updated_at = ?3
            WHERE id = ?4 AND status = 'pending'
            "#,
            params![target.as_str(), rejection_reason, format_ts(&now), id],
        )?;
        Ok(rows)
    }

    /// 写回可编辑字段（通用更新）
    pub fn update_fields(&self, company: &Company) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE companies SET
                name = ?1, website = ?2, phone = ?3, description = ?4, linkedin_url = ?5,
                industry = ?6, sub_industry = ?7, address_street = ?8, address_city = ?9,
                address_state = ?10, address_country = ?11, address_zip = ?12,
                founded_year = ?13, revenue_range = ?14, employee_size_range = ?15,
                segment_id = ?16, updated_at = ?17
            WHERE id = ?18
            "#,
            params![
                company.name,
                company.website,
                company.phone,
                company.description,
                company.linkedin_url,
                company.industry,
                company.sub_industry,
                company.address_street,
                company.address_city,
                company.address_state,
                company.address_country,
                company.address_zip,
                company.founded_year,
                company.revenue_range,
                company.employee_size_range,
                company.segment_id,
                format_ts(&company.updated_at),
                company.id,
            ],
        )?;
        Ok(rows)
    }

    /// 软删除
    pub fn deactivate(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE companies SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![format_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], map_company) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按（已规范化的）名称查找 approved 且活跃的公司
    ///
    /// 同名多条时取最早创建的一条
    pub fn find_approved_by_name(&self, name: &str) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM companies
            WHERE name = ?1 AND status = 'approved' AND is_active = 1
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
            COMPANY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![name], map_company) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<Company>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM companies WHERE batch_id = ?1 ORDER BY created_at ASC, id ASC",
            COMPANY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![batch_id], map_company)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_segment(&self, segment_id: &str) -> RepositoryResult<Vec<Company>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM companies WHERE segment_id = ?1 ORDER BY created_at ASC, id ASC",
            COMPANY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![segment_id], map_company)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 插入单条公司记录（供事务内批量落库复用）
pub(crate) fn insert_company(conn: &Connection, c: &Company) -> SqliteResult<usize> {
    let sql = format!(
        "INSERT INTO companies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
        COMPANY_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            c.id,
            c.name,
            c.website,
            c.phone,
            c.description,
            c.linkedin_url,
            c.industry,
            c.sub_industry,
            c.address_street,
            c.address_city,
            c.address_state,
            c.address_country,
            c.address_zip,
            c.founded_year,
            c.revenue_range,
            c.employee_size_range,
            c.segment_id,
            c.status.as_str(),
            c.rejection_reason,
            c.is_duplicate,
            c.is_active,
            c.batch_id,
            c.created_by,
            format_ts(&c.created_at),
            format_ts(&c.updated_at),
        ],
    )
}

fn map_company(row: &Row) -> SqliteResult<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        website: row.get(2)?,
        phone: row.get(3)?,
        description: row.get(4)?,
        linkedin_url: row.get(5)?,
        industry: row.get(6)?,
        sub_industry: row.get(7)?,
        address_street: row.get(8)?,
        address_city: row.get(9)?,
        address_state: row.get(10)?,
        address_country: row.get(11)?,
        address_zip: row.get(12)?,
        founded_year: row.get(13)?,
        revenue_range: row.get(14)?,
        employee_size_range: row.get(15)?,
        segment_id: row.get(16)?,
        status: decode_enum(17, row.get(17)?, CompanyStatus::from_db_str)?,
        rejection_reason: row.get(18)?,
        is_duplicate: row.get(19)?,
        is_active: row.get(20)?,
        batch_id: row.get(21)?,
        created_by: row.get(22)?,
        created_at: parse_ts(&row.get::<_, String>(23)?),
        updated_at: parse_ts(&row.get::<_, String>(24)?),
    })
}
