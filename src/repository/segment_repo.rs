// ==========================================
// 线索管理后端 - 细分 / 产品线数据仓储
// ==========================================
// 对齐: segments / offerings / segment_offerings 表（另读 assignments 取我的细分）
// 红线: Repository 不做业务逻辑，只做数据映射
// ==========================================

use crate::domain::segment::{Offering, Segment};
use crate::domain::types::{format_ts, parse_ts, SegmentStatus};
use crate::repository::decode_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SEGMENT_COLUMNS: &str =
    "id, name, description, status, created_by, created_at, updated_at";

pub struct SegmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SegmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 细分
    // ==========================================

    pub fn insert(&self, segment: &Segment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO segments (id, name, description, status, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                segment.id,
                segment.name,
                segment.description,
                segment.status.as_str(),
                segment.created_by,
                format_ts(&segment.created_at),
                format_ts(&segment.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Segment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM segments WHERE id = ?1", SEGMENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], map_segment) {
            Ok(seg) => Ok(Some(seg)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Segment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM segments WHERE name = ?1", SEGMENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![name], map_segment) {
            Ok(seg) => Ok(Some(seg)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按名称查找 active 细分（CSV 导入解析 "Segment Name"）
    pub fn find_active_by_name(&self, name: &str) -> RepositoryResult<Option<Segment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM segments WHERE name = ?1 AND status = 'active'",
            SEGMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![name], map_segment) {
            Ok(seg) => Ok(Some(seg)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Segment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM segments ORDER BY name ASC", SEGMENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_segment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出分配给用户的 active 细分（有效分配）
    pub fn list_assigned_to(&self, user_id: &str) -> RepositoryResult<Vec<Segment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.id, s.name, s.description, s.status, s.created_by, s.created_at, s.updated_at
            FROM segments s
            JOIN assignments a ON a.entity_id = s.id AND a.entity_type = 'segment'
            WHERE a.assigned_to = ?1 AND a.is_active = 1 AND s.status = 'active'
            ORDER BY s.name ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![user_id], map_segment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 切换状态
    ///
    /// # 返回
    /// - `Ok(true)`: 状态发生变化
    /// - `Ok(false)`: 已是目标状态或记录不存在
    pub fn set_status(
        &self,
        id: &str,
        status: SegmentStatus,
        now: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE segments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status <> ?1",
            params![status.as_str(), format_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    // ==========================================
    // 产品线
    // ==========================================

    pub fn insert_offering(&self, offering: &Offering) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO offerings (id, name, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                offering.id,
                offering.name,
                offering.description,
                offering.status.as_str(),
                format_ts(&offering.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_offering_by_id(&self, id: &str) -> RepositoryResult<Option<Offering>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, status, created_at FROM offerings WHERE id = ?1",
        )?;

        match stmt.query_row(params![id], map_offering) {
            Ok(o) => Ok(Some(o)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 建立细分-产品线关联（已存在时忽略）
    pub fn link_offering(&self, segment_id: &str, offering_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "INSERT OR IGNORE INTO segment_offerings (segment_id, offering_id) VALUES (?1, ?2)",
            params![segment_id, offering_id],
        )?;
        Ok(rows > 0)
    }

    pub fn unlink_offering(&self, segment_id: &str, offering_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM segment_offerings WHERE segment_id = ?1 AND offering_id = ?2",
            params![segment_id, offering_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_offerings_for_segment(&self, segment_id: &str) -> RepositoryResult<Vec<Offering>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT o.id, o.name, o.description, o.status, o.created_at
            FROM offerings o
            JOIN segment_offerings so ON so.offering_id = o.id
            WHERE so.segment_id = ?1
            ORDER BY o.name ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![segment_id], map_offering)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_segments_for_offering(&self, offering_id: &str) -> RepositoryResult<Vec<Segment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.id, s.name, s.description, s.status, s.created_by, s.created_at, s.updated_at
            FROM segments s
            JOIN segment_offerings so ON so.segment_id = s.id
            WHERE so.offering_id = ?1
            ORDER BY s.name ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![offering_id], map_segment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_segment(row: &Row) -> SqliteResult<Segment> {
    Ok(Segment {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: decode_enum(3, row.get(3)?, SegmentStatus::from_db_str)?,
        created_by: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
        updated_at: parse_ts(&row.get::<_, String>(6)?),
    })
}

fn map_offering(row: &Row) -> SqliteResult<Offering> {
    Ok(Offering {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: decode_enum(3, row.get(3)?, SegmentStatus::from_db_str)?,
        created_at: parse_ts(&row.get::<_, String>(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use uuid::Uuid;

    fn setup() -> (SegmentRepository, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, email, name, is_active, created_at) VALUES ('u1', 'o@x.io', 'Owner', 1, '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (SegmentRepository::new(conn.clone()), conn)
    }

    fn segment(name: &str) -> Segment {
        let now = Utc::now();
        Segment {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            status: SegmentStatus::Active,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_lookup_respects_status() {
        let (repo, _conn) = setup();
        let seg = segment("Fintech");
        repo.insert(&seg).unwrap();

        assert!(repo.find_active_by_name("Fintech").unwrap().is_some());
        assert!(repo.set_status(&seg.id, SegmentStatus::Archived, Utc::now()).unwrap());
        assert!(!repo.set_status(&seg.id, SegmentStatus::Archived, Utc::now()).unwrap());
        assert!(repo.find_active_by_name("Fintech").unwrap().is_none());
        assert_eq!(
            repo.find_by_name("Fintech").unwrap().unwrap().status,
            SegmentStatus::Archived
        );
    }

    #[test]
    fn test_duplicate_name_is_unique_violation() {
        let (repo, _conn) = setup();
        repo.insert(&segment("Health")).unwrap();
        let err = repo.insert(&segment("Health")).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_assigned_segments_skip_archived_and_inactive() {
        let (repo, conn) = setup();
        let fintech = segment("Fintech");
        let health = segment("Health");
        let legacy = segment("Legacy");
        for s in [&fintech, &health, &legacy] {
            repo.insert(s).unwrap();
        }
        repo.set_status(&legacy.id, SegmentStatus::Archived, Utc::now()).unwrap();

        let ts = "2026-01-01T00:00:00.000000Z";
        {
            let conn = conn.lock().unwrap();
            for (id, seg, active) in [
                ("a1", &fintech.id, 1),
                ("a2", &health.id, 0),
                ("a3", &legacy.id, 1),
            ] {
                conn.execute(
                    "INSERT INTO assignments (id, entity_type, entity_id, assigned_to, assigned_by, is_active, created_at, updated_at) \
                     VALUES (?1, 'segment', ?2, 'u1', 'u1', ?3, ?4, ?4)",
                    params![id, seg, active, ts],
                )
                .unwrap();
            }
        }

        let mine = repo.list_assigned_to("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Fintech");
        assert!(repo.list_assigned_to("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_offering_links_both_directions() {
        let (repo, _conn) = setup();
        let seg = segment("Retail");
        repo.insert(&seg).unwrap();
        let offering = Offering {
            id: Uuid::new_v4().to_string(),
            name: "Data Platform".to_string(),
            description: None,
            status: SegmentStatus::Active,
            created_at: Utc::now(),
        };
        repo.insert_offering(&offering).unwrap();

        assert!(repo.link_offering(&seg.id, &offering.id).unwrap());
        assert!(!repo.link_offering(&seg.id, &offering.id).unwrap());

        assert_eq!(repo.list_offerings_for_segment(&seg.id).unwrap().len(), 1);
        assert_eq!(repo.list_segments_for_offering(&offering.id).unwrap()[0].name, "Retail");

        assert!(repo.unlink_offering(&seg.id, &offering.id).unwrap());
        assert!(repo.list_offerings_for_segment(&seg.id).unwrap().is_empty());
    }
}
