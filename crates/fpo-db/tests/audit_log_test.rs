//! Integration tests for the lifecycle audit ledger using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use fpo_core::models::audit::{AuditOutcome, CreateAuditLogEntry};
use fpo_core::models::organization::OrgStatus;
use fpo_core::repository::{AuditLogRepository, Pagination};
use fpo_db::repository::SurrealAuditLogRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealAuditLogRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fpo_db::run_migrations(&db).await.unwrap();
    SurrealAuditLogRepository::new(db)
}

fn entry(org_id: Uuid, action: &str, offset_secs: i64) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        organization_id: org_id,
        action: action.into(),
        previous_state: OrgStatus::Draft,
        new_state: OrgStatus::PendingVerification,
        outcome: AuditOutcome::Success,
        reason: Some("ready for review".into()),
        performed_by: Uuid::new_v4(),
        performed_at: Utc::now() + Duration::seconds(offset_secs),
        details: serde_json::json!({}),
        request_id: format!("req-{action}"),
    }
}

#[tokio::test]
async fn append_returns_persisted_entry() {
    let repo = setup().await;
    let org_id = Uuid::new_v4();

    let written = repo.append(entry(org_id, "submit", 0)).await.unwrap();
    assert_eq!(written.organization_id, org_id);
    assert_eq!(written.action, "submit");

    let history = repo
        .list_by_organization(org_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.total, 1);
    let stored = &history.items[0];
    assert_eq!(stored.id, written.id);
    assert_eq!(stored.previous_state, OrgStatus::Draft);
    assert_eq!(stored.new_state, OrgStatus::PendingVerification);
    assert_eq!(stored.outcome, AuditOutcome::Success);
    assert_eq!(stored.request_id, "req-submit");
    assert_eq!(stored.reason.as_deref(), Some("ready for review"));
}

#[tokio::test]
async fn history_is_ordered_oldest_first_and_scoped() {
    let repo = setup().await;
    let org_id = Uuid::new_v4();
    let other_org = Uuid::new_v4();

    // Appended out of order on purpose.
    repo.append(entry(org_id, "approve", 20)).await.unwrap();
    repo.append(entry(org_id, "submit", 10)).await.unwrap();
    repo.append(entry(org_id, "begin-setup", 30)).await.unwrap();
    repo.append(entry(other_org, "submit", 0)).await.unwrap();

    let history = repo
        .list_by_organization(org_id, Pagination::default())
        .await
        .unwrap();

    let actions: Vec<_> = history.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["submit", "approve", "begin-setup"]);
    assert_eq!(history.total, 3);
}

#[tokio::test]
async fn history_paginates() {
    let repo = setup().await;
    let org_id = Uuid::new_v4();
    for i in 0..5 {
        repo.append(entry(org_id, &format!("a{i}"), i)).await.unwrap();
    }

    let page = repo
        .list_by_organization(
            org_id,
            Pagination {
                offset: 2,
                limit: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(page.total, 5);
    let actions: Vec<_> = page.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["a2", "a3"]);
}

#[tokio::test]
async fn failure_details_are_kept() {
    let repo = setup().await;
    let org_id = Uuid::new_v4();

    let mut failed = entry(org_id, "begin-setup", 0);
    failed.previous_state = OrgStatus::Verified;
    failed.new_state = OrgStatus::SetupFailed;
    failed.outcome = AuditOutcome::Failure;
    failed.details = serde_json::json!({
        "step": "org_created",
        "cause": "external service unavailable: 503",
    });
    repo.append(failed).await.unwrap();

    let history = repo
        .list_by_organization(org_id, Pagination::default())
        .await
        .unwrap();
    let stored = &history.items[0];
    assert_eq!(stored.outcome, AuditOutcome::Failure);
    assert_eq!(stored.details["step"], "org_created");
}
