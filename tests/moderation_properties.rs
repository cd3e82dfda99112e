/// Behavioral properties of the transition engine and bulk coordinator,
/// exercised through the public crate API.
use marketplace_moderation::db;
use marketplace_moderation::moderation::{
    audit, ActionPayload, ActionRequest, AdminAction, AuditPolicy, BulkActionCoordinator,
    ListingStatus, ModeratableEntity, PayloadResolver, StatusTransitionEngine,
};
use marketplace_moderation::store::{EntityRepository, InMemoryRepository, SqliteRepository};
use marketplace_moderation::ModerationError;
use std::sync::Arc;

fn pending(id: &str, owner: &str) -> ModeratableEntity {
    ModeratableEntity::listing_with_id(id, owner, ListingStatus::Pending).unwrap()
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_every_listing_action_appends_one_entry_and_keeps_input() {
    let engine = StatusTransitionEngine::default();
    let cases = [
        (AdminAction::Approve, ActionPayload::default(), "approved"),
        (AdminAction::Reject, ActionPayload::with_reason("blurry photos"), "rejected"),
        (AdminAction::RequestEdits, ActionPayload::default(), "needs-edits"),
        (AdminAction::Hide, ActionPayload::default(), "hidden"),
        (AdminAction::Expire, ActionPayload::default(), "expired"),
        (AdminAction::MarkDuplicate, ActionPayload::default(), "duplicate"),
        (AdminAction::Feature, ActionPayload::default(), "pending"),
    ];

    for (action, payload, expected) in cases {
        let listing = pending("l-1", "alice");
        let before = listing.clone();

        let request = ActionRequest::new(action, "admin-1").with_payload(payload);
        let updated = engine.apply_action(&listing, &request).unwrap();

        assert_eq!(listing, before, "{} mutated its input", action.as_str());
        assert_eq!(updated.status_str(), expected, "{}", action.as_str());
        assert_eq!(updated.audit_log.len(), listing.audit_log.len() + 1);
        assert_eq!(updated.version, listing.version + 1);
        assert_eq!(updated.audit_log.last().unwrap().actor, "admin-1");
    }
}

#[test]
fn test_reject_without_reason_records_nothing() {
    let engine = StatusTransitionEngine::default();
    let listing = pending("l-1", "alice");

    let err = engine
        .apply_action(&listing, &ActionRequest::new(AdminAction::Reject, "admin-1"))
        .unwrap_err();
    assert!(matches!(err, ModerationError::MissingJustification { .. }));
    assert!(listing.audit_log.is_empty());
}

#[test]
fn test_suspend_records_reason_and_duration() {
    let engine = StatusTransitionEngine::default();
    let account = ModeratableEntity::new_account("u-1").unwrap();

    let request = ActionRequest::new(AdminAction::Suspend, "admin-1").with_payload(ActionPayload {
        reason: Some("policy violation".into()),
        duration: Some("7 days".into()),
        ..Default::default()
    });
    let suspended = engine.apply_action(&account, &request).unwrap();

    assert_eq!(suspended.status_str(), "Suspended");
    let note = suspended.audit_log.last().unwrap().note.clone().unwrap();
    assert!(note.contains("policy violation"));
}

#[test]
fn test_feature_twice_restores_flag() {
    let engine = StatusTransitionEngine::default();
    let listing = pending("l-1", "alice");
    let request = ActionRequest::new(AdminAction::Feature, "admin-1");

    let once = engine.apply_action(&listing, &request).unwrap();
    let twice = engine.apply_action(&once, &request).unwrap();

    assert!(once.is_featured());
    assert_eq!(twice.is_featured(), listing.is_featured());
    assert_eq!(twice.audit_log.len(), 2);
    assert_eq!(twice.audit_log.entries()[0].action, "featured");
    assert_eq!(twice.audit_log.entries()[1].action, "unfeatured");
}

#[test]
fn test_skip_noops_policy() {
    let engine = StatusTransitionEngine::new(AuditPolicy::SkipNoOps);
    let listing = pending("l-1", "alice");
    let hide = ActionRequest::new(AdminAction::Hide, "admin-1");

    let hidden = engine.apply_action(&listing, &hide).unwrap();
    let err = engine.apply_action(&hidden, &hide).unwrap_err();
    assert!(matches!(err, ModerationError::NoOpTransition { .. }));

    // The default policy records the repeated action
    let again = StatusTransitionEngine::default().apply_action(&hidden, &hide).unwrap();
    assert_eq!(again.audit_log.len(), 2);
}

#[test]
fn test_audit_display_round_trips() {
    let engine = StatusTransitionEngine::default();
    let mut listing = pending("l-1", "alice");
    let steps = [
        ActionRequest::new(AdminAction::RequestEdits, "admin\t1")
            .with_payload(ActionPayload::with_note("missing\nfloor plan")),
        ActionRequest::new(AdminAction::Approve, "admin-2"),
        ActionRequest::new(AdminAction::Feature, "admin-2"),
        ActionRequest::new(AdminAction::Reject, "admin-3")
            .with_payload(ActionPayload::with_reason(r"C:\path spam")),
    ];
    for request in &steps {
        listing = engine.apply_action(&listing, request).unwrap();
    }

    let text = audit::format_log(&listing.audit_log);
    assert_eq!(text.lines().count(), 4);
    assert_eq!(audit::parse_log(&text).unwrap(), listing.audit_log);
}

#[tokio::test]
async fn test_bulk_reports_missing_entities() {
    let repo = Arc::new(InMemoryRepository::with_entities([
        pending("id1", "alice"),
        pending("id3", "bob"),
    ]));
    let coordinator = BulkActionCoordinator::new(StatusTransitionEngine::default(), repo.clone());

    let result = coordinator
        .apply_bulk(
            &ids(&["id1", "missing", "id3"]),
            AdminAction::Approve,
            "admin-1",
            &PayloadResolver::constant(ActionPayload::default()),
        )
        .await
        .unwrap();

    let succeeded: Vec<_> = result.succeeded.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(succeeded, vec!["id1", "id3"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, "missing");
    assert_eq!(result.failed[0].error.code(), "EntityNotFound");
}

#[tokio::test]
async fn test_bulk_against_sqlite_store() {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let repo = Arc::new(SqliteRepository::new(pool));
    for (id, owner) in [("l-1", "alice"), ("l-2", "bob")] {
        repo.save(&pending(id, owner)).await.unwrap();
    }

    let coordinator = BulkActionCoordinator::new(StatusTransitionEngine::default(), repo.clone());
    let err = coordinator
        .apply_bulk(
            &[],
            AdminAction::Hide,
            "admin-1",
            &PayloadResolver::constant(ActionPayload::default()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ModerationError::EmptySelection));

    let result = coordinator
        .apply_bulk(
            &ids(&["l-1", "l-2"]),
            AdminAction::Hide,
            "admin-1",
            &PayloadResolver::constant(ActionPayload::with_note("Reported twice")),
        )
        .await
        .unwrap();
    assert!(result.is_complete_success());

    for id in ["l-1", "l-2"] {
        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status_str(), "hidden");
        assert_eq!(stored.version, 1);
        assert_eq!(
            stored.audit_log.last().unwrap().note.as_deref(),
            Some("Reported twice")
        );
    }
}

#[tokio::test]
async fn test_concurrent_admins_cannot_overwrite_each_other() {
    let repo = InMemoryRepository::with_entities([pending("l-1", "alice")]);
    let engine = StatusTransitionEngine::default();
    let original = repo.get("l-1").await.unwrap().unwrap();

    let approved = engine
        .apply_action(&original, &ActionRequest::new(AdminAction::Approve, "admin-1"))
        .unwrap();
    let hidden = engine
        .apply_action(&original, &ActionRequest::new(AdminAction::Hide, "admin-2"))
        .unwrap();

    repo.save(&approved).await.unwrap();
    assert!(matches!(
        repo.save(&hidden).await,
        Err(ModerationError::Conflict(_))
    ));
    assert_eq!(repo.get("l-1").await.unwrap().unwrap().status_str(), "approved");
}
