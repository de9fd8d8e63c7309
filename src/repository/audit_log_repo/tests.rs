use super::AuditLogRepository;
use crate::domain::audit::{AuditAction, AuditEntity};
use crate::repository::collaborators::AuditSink;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_record_and_find_by_entity() {
    let repo = AuditLogRepository::new(setup_test_db());

    repo.record(Some("u1"), AuditAction::Create, AuditEntity::Company, Some("c1"), None)
        .unwrap();
    repo.record(
        Some("u2"),
        AuditAction::Reject,
        AuditEntity::Company,
        Some("c1"),
        Some(json!({ "reason": "out of scope" })),
    )
    .unwrap();
    repo.record(Some("u1"), AuditAction::Create, AuditEntity::Company, Some("c2"), None)
        .unwrap();

    let trail = repo.find_by_entity("company", "c1").unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, "create");
    assert_eq!(trail[1].action, "reject");
    assert_eq!(trail[1].details.as_ref().unwrap()["reason"], "out of scope");
}

#[test]
fn test_system_events_have_no_actor() {
    let repo = AuditLogRepository::new(setup_test_db());

    repo.record(
        None,
        AuditAction::DedupCompanies,
        AuditEntity::Company,
        None,
        Some(json!({ "flagged": 3 })),
    )
    .unwrap();

    let events = repo.find_by_action("dedup_companies").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor_id, None);
    assert_eq!(events[0].entity_id, None);
    assert_eq!(events[0].details.as_ref().unwrap()["flagged"], 3);
}

#[test]
fn test_find_by_actor_newest_first() {
    let repo = AuditLogRepository::new(setup_test_db());

    repo.record(Some("u1"), AuditAction::Approve, AuditEntity::Contact, Some("k1"), None)
        .unwrap();
    repo.record(Some("u1"), AuditAction::AssignSdr, AuditEntity::Contact, Some("k1"), None)
        .unwrap();

    let events = repo.find_by_actor("u1").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "assign_sdr");
    assert!(repo.find_by_id(&events[1].id).unwrap().is_some());
}
