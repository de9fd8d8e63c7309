// ==========================================
// 线索管理后端 - 去重扫描引擎
// ==========================================
// 职责: 依次执行公司 / 联系人两轮去重标记，汇总结果
// 红线: 两轮相互独立；一轮失败不阻止另一轮，结果分别上报
// 红线: 幂等；只置位 is_duplicate，不清除
// ==========================================

use crate::domain::audit::{AuditAction, AuditEntity};
use crate::repository::{AuditSink, DedupRepository, RepositoryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// 单轮去重结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Completed { flagged: usize },
    Failed { error: String },
}

impl PassOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PassOutcome::Completed { .. })
    }

    /// 本轮新标记行数（失败为 0）
    pub fn flagged(&self) -> usize {
        match self {
            PassOutcome::Completed { flagged } => *flagged,
            PassOutcome::Failed { .. } => 0,
        }
    }
}

/// 一次扫描的完整报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    pub companies: PassOutcome,
    pub contacts: PassOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DedupReport {
    pub fn is_fully_completed(&self) -> bool {
        self.companies.is_completed() && self.contacts.is_completed()
    }
}

// ==========================================
// DedupSweep
// ==========================================
pub struct DedupSweep {
    repo: Arc<DedupRepository>,
    audit: Arc<dyn AuditSink>,
}

impl DedupSweep {
    pub fn new(repo: Arc<DedupRepository>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repo, audit }
    }

    /// 执行一次完整扫描（公司轮 → 联系人轮）；actor 为空表示系统触发
    pub fn run(&self, actor_id: Option<&str>) -> DedupReport {
        let started_at = Utc::now();
        info!(actor_id, "开始去重扫描");

        let companies = self.run_pass(
            actor_id,
            "companies",
            AuditAction::DedupCompanies,
            AuditEntity::Company,
            |now| self.repo.flag_duplicate_companies(now),
        );
        let contacts = self.run_pass(
            actor_id,
            "contacts",
            AuditAction::DedupContacts,
            AuditEntity::Contact,
            |now| self.repo.flag_duplicate_contacts(now),
        );

        let report = DedupReport {
            companies,
            contacts,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            companies_flagged = report.companies.flagged(),
            contacts_flagged = report.contacts.flagged(),
            fully_completed = report.is_fully_completed(),
            "去重扫描完成"
        );
        report
    }

    fn run_pass<F>(
        &self,
        actor_id: Option<&str>,
        pass: &'static str,
        action: AuditAction,
        entity: AuditEntity,
        flag: F,
    ) -> PassOutcome
    where
        F: FnOnce(DateTime<Utc>) -> RepositoryResult<usize>,
    {
        match flag(Utc::now()) {
            Ok(flagged) => {
                info!(pass, flagged, "去重轮次完成");
                self.audit
                    .record_or_warn(actor_id, action, entity, None, Some(json!({ "flagged": flagged })));
                PassOutcome::Completed { flagged }
            }
            Err(e) => {
                error!(pass, error = %e, "去重轮次失败");
                PassOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::repository::AuditLogRepository;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (DedupSweep, Arc<Mutex<Connection>>, Arc<AuditLogRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO users (id, email, name, is_active, created_at)
            VALUES ('u1', 'r@x.io', 'Researcher', 1, '2026-01-01T00:00:00.000000Z');
            INSERT INTO segments (id, name, status, created_by, created_at, updated_at)
            VALUES ('s1', 'Fintech', 'active', 'u1', '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z');
            INSERT INTO companies (id, name, website, segment_id, created_by, created_at, updated_at) VALUES
                ('c1', 'Acme', 'https://acme.com', 's1', 'u1', '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z'),
                ('c2', ' ACME ', 'HTTPS://ACME.COM', 's1', 'u1', '2026-01-02T00:00:00.000000Z', '2026-01-02T00:00:00.000000Z');
            "#,
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let audit = Arc::new(AuditLogRepository::new(conn.clone()));
        let sweep = DedupSweep::new(Arc::new(DedupRepository::new(conn.clone())), audit.clone());
        (sweep, conn, audit)
    }

    #[test]
    fn test_sweep_reports_each_pass_and_audits() {
        let (sweep, _conn, audit) = setup();

        let first = sweep.run(Some("u1"));
        assert_eq!(first.companies, PassOutcome::Completed { flagged: 1 });
        assert_eq!(first.contacts, PassOutcome::Completed { flagged: 0 });
        assert!(first.is_fully_completed());

        let second = sweep.run(None);
        assert_eq!(second.companies.flagged(), 0);

        let events = audit.find_by_action("dedup_companies").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events.iter().filter(|e| e.actor_id.as_deref() == Some("u1")).count(),
            1
        );
        assert_eq!(events.iter().filter(|e| e.actor_id.is_none()).count(), 1);
    }

    #[test]
    fn test_failed_pass_does_not_block_other() {
        let (sweep, conn, _audit) = setup();
        conn.lock()
            .unwrap()
            .execute_batch("DROP TABLE contacts;")
            .unwrap();

        let report = sweep.run(None);
        assert_eq!(report.companies, PassOutcome::Completed { flagged: 1 });
        assert!(matches!(report.contacts, PassOutcome::Failed { .. }));
        assert!(!report.is_fully_completed());
    }
}
