/// Status transition engine
///
/// Maps an admin action onto an entity's next state and appends exactly one
/// audit entry. The engine is pure: it performs no I/O and never mutates the
/// entity it is given.
use super::action::{parse_suspension_duration, ActionPayload, ActionRequest, AdminAction};
use super::entity::{
    AccountStatus, AuditEntry, EntityKind, EntityState, ListingStatus, ModeratableEntity,
};
use crate::error::{ModerationError, ModerationResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Whether transitions that change nothing are still recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditPolicy {
    /// Every admin action is applied and audited, including no-ops
    #[default]
    RecordAll,
    /// No-ops fail with `NoOpTransition` and leave the entity untouched
    SkipNoOps,
}

impl AuditPolicy {
    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "record-all" => Ok(AuditPolicy::RecordAll),
            "skip-noops" => Ok(AuditPolicy::SkipNoOps),
            _ => Err(ModerationError::Validation(format!("Invalid audit policy: {}", s))),
        }
    }
}

/// Next state computed for a request
struct Planned {
    state: EntityState,
    audit_action: &'static str,
    note: Option<String>,
    changed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTransitionEngine {
    policy: AuditPolicy,
}

impl StatusTransitionEngine {
    pub fn new(policy: AuditPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AuditPolicy {
        self.policy
    }

    /// Apply an action at the current time
    pub fn apply_action(
        &self,
        entity: &ModeratableEntity,
        request: &ActionRequest,
    ) -> ModerationResult<ModeratableEntity> {
        self.apply_action_at(entity, request, Utc::now())
    }

    /// Apply an action given by name, as submitted by admin forms
    pub fn apply_named(
        &self,
        entity: &ModeratableEntity,
        action: &str,
        actor: &str,
        payload: ActionPayload,
    ) -> ModerationResult<ModeratableEntity> {
        let action = AdminAction::parse(action, Some(entity.kind()))?;
        self.apply_action(entity, &ActionRequest::new(action, actor).with_payload(payload))
    }

    /// Whether the request would change the entity. Fails on the same
    /// preconditions as `apply_action_at`.
    pub fn would_change(
        &self,
        entity: &ModeratableEntity,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> ModerationResult<bool> {
        Ok(self.plan(entity, request, now)?.changed)
    }

    pub fn apply_action_at(
        &self,
        entity: &ModeratableEntity,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> ModerationResult<ModeratableEntity> {
        let planned = self.plan(entity, request, now)?;

        if !planned.changed && self.policy == AuditPolicy::SkipNoOps {
            return Err(ModerationError::NoOpTransition {
                action: request.action.as_str().to_string(),
                status: entity.status_str().to_string(),
            });
        }

        let mut updated = entity.clone();
        updated.state = planned.state;
        updated.version += 1;
        updated.audit_log.append(AuditEntry::new(
            planned.audit_action,
            request.actor.clone(),
            now,
            planned.note,
        ));

        Ok(updated)
    }

    fn plan(
        &self,
        entity: &ModeratableEntity,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> ModerationResult<Planned> {
        let action = request.action;
        let kind = entity.kind();

        if !action.applies_to(kind) {
            return Err(ModerationError::UnknownAction {
                action: action.as_str().to_string(),
                kind: Some(kind),
            });
        }

        let justification = request.payload.justification();
        if action.requires_justification() && justification.is_none() {
            return Err(ModerationError::MissingJustification {
                action: action.as_str().to_string(),
            });
        }

        match &entity.state {
            EntityState::Listing {
                status,
                expires_at,
                featured,
            } => plan_listing(
                action,
                &request.payload,
                justification,
                *status,
                *expires_at,
                *featured,
                now,
            ),
            EntityState::Account {
                status,
                suspended_until,
            } => plan_account(
                action,
                &request.payload,
                justification,
                *status,
                *suspended_until,
                now,
            ),
        }
    }
}

fn plan_listing(
    action: AdminAction,
    payload: &ActionPayload,
    note: Option<String>,
    status: ListingStatus,
    expires_at: Option<DateTime<Utc>>,
    featured: bool,
    now: DateTime<Utc>,
) -> ModerationResult<Planned> {
    // Leaving `expired` drops a lapsed expiration date
    let set_status = |next: ListingStatus, audit_action: &'static str| Planned {
        state: EntityState::Listing {
            status: next,
            expires_at: if status == ListingStatus::Expired && next != status {
                expires_at.filter(|t| *t > now)
            } else {
                expires_at
            },
            featured,
        },
        audit_action,
        note: note.clone(),
        changed: next != status,
    };

    let expire_now = || Planned {
        state: EntityState::Listing {
            status: ListingStatus::Expired,
            expires_at: Some(now),
            featured,
        },
        audit_action: "expired",
        note: note.clone(),
        changed: status != ListingStatus::Expired,
    };

    let planned = match action {
        AdminAction::Approve => set_status(ListingStatus::Approved, "approved"),
        AdminAction::Reject => set_status(ListingStatus::Rejected, "rejected"),
        AdminAction::RequestEdits => set_status(ListingStatus::NeedsEdits, "edits-requested"),
        AdminAction::Hide => set_status(ListingStatus::Hidden, "hidden"),
        AdminAction::MarkDuplicate => set_status(ListingStatus::Duplicate, "marked-duplicate"),
        AdminAction::Expire => expire_now(),
        AdminAction::AdjustExpiration => match payload.days {
            Some(days) if days > 0 => {
                let next = Duration::try_days(days)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        ModerationError::InvalidPayload(format!("Expiration out of range: {} days", days))
                    })?;
                Planned {
                    state: EntityState::Listing {
                        status,
                        expires_at: Some(next),
                        featured,
                    },
                    audit_action: "expiration-adjusted",
                    note: Some(match &note {
                        Some(note) => format!("{} (expires in {} days)", note, days),
                        None => format!("expires in {} days", days),
                    }),
                    changed: expires_at != Some(next),
                }
            }
            _ => expire_now(),
        },
        AdminAction::Feature => Planned {
            state: EntityState::Listing {
                status,
                expires_at,
                featured: !featured,
            },
            audit_action: if featured { "unfeatured" } else { "featured" },
            note,
            changed: true,
        },
        AdminAction::Unfeature => Planned {
            state: EntityState::Listing {
                status,
                expires_at,
                featured: false,
            },
            audit_action: "unfeatured",
            note,
            changed: featured,
        },
        AdminAction::Suspend | AdminAction::Restore => {
            return Err(ModerationError::UnknownAction {
                action: action.as_str().to_string(),
                kind: Some(EntityKind::Listing),
            })
        }
    };

    Ok(planned)
}

fn plan_account(
    action: AdminAction,
    payload: &ActionPayload,
    note: Option<String>,
    status: AccountStatus,
    suspended_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ModerationResult<Planned> {
    match action {
        AdminAction::Suspend => {
            let (until, note) = match payload.duration.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => {
                    let until = match parse_suspension_duration(text)? {
                        Some(d) => Some(now.checked_add_signed(d).ok_or_else(|| {
                            ModerationError::InvalidPayload(format!("Suspension out of range: {}", text))
                        })?),
                        None => None,
                    };
                    let note = note.map(|n| format!("{} (duration: {})", n, text));
                    (until, note)
                }
                _ => (None, note),
            };

            Ok(Planned {
                state: EntityState::Account {
                    status: AccountStatus::Suspended,
                    suspended_until: until,
                },
                audit_action: "suspended",
                note,
                changed: status != AccountStatus::Suspended || suspended_until != until,
            })
        }
        AdminAction::Restore => Ok(Planned {
            state: EntityState::Account {
                status: AccountStatus::Active,
                suspended_until: None,
            },
            audit_action: "restored",
            note,
            changed: status != AccountStatus::Active,
        }),
        other => Err(ModerationError::UnknownAction {
            action: other.as_str().to_string(),
            kind: Some(EntityKind::Account),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_listing() -> ModeratableEntity {
        ModeratableEntity::listing_with_id("listing-1", "owner-1", ListingStatus::Pending).unwrap()
    }

    fn request(action: AdminAction) -> ActionRequest {
        ActionRequest::new(action, "admin-1")
    }

    #[test]
    fn test_status_table() {
        let engine = StatusTransitionEngine::default();
        let cases = [
            (AdminAction::Approve, "approved", "approved"),
            (AdminAction::RequestEdits, "needs-edits", "edits-requested"),
            (AdminAction::Hide, "hidden", "hidden"),
            (AdminAction::Expire, "expired", "expired"),
            (AdminAction::MarkDuplicate, "duplicate", "marked-duplicate"),
        ];

        for (action, status, audit_action) in cases {
            let updated = engine.apply_action(&pending_listing(), &request(action)).unwrap();
            assert_eq!(updated.status_str(), status, "{:?}", action);
            assert_eq!(updated.audit_log.len(), 1);
            assert_eq!(updated.audit_log.last().unwrap().action, audit_action);
            assert_eq!(updated.version, 1);
        }
    }

    #[test]
    fn test_reject_requires_reason() {
        let engine = StatusTransitionEngine::default();
        let listing = pending_listing();

        let err = engine
            .apply_action(
                &listing,
                &request(AdminAction::Reject).with_payload(ActionPayload::with_reason("")),
            )
            .unwrap_err();
        assert!(matches!(err, ModerationError::MissingJustification { .. }));
        assert!(listing.audit_log.is_empty());

        let updated = engine
            .apply_action(
                &listing,
                &request(AdminAction::Reject).with_payload(ActionPayload::with_reason("Blurry photos")),
            )
            .unwrap();
        assert_eq!(updated.status_str(), "rejected");
        assert_eq!(updated.audit_log.last().unwrap().note.as_deref(), Some("Blurry photos"));
    }

    #[test]
    fn test_expire_forces_expiration_to_now() {
        let engine = StatusTransitionEngine::default();
        let now = Utc::now();
        let updated = engine
            .apply_action_at(&pending_listing(), &request(AdminAction::Expire), now)
            .unwrap();

        match updated.state {
            EntityState::Listing { status, expires_at, .. } => {
                assert_eq!(status, ListingStatus::Expired);
                assert_eq!(expires_at, Some(now));
            }
            _ => panic!("expected listing"),
        }
    }

    #[test]
    fn test_leaving_expired_clears_lapsed_date() {
        let engine = StatusTransitionEngine::default();
        let now = Utc::now();
        let expired = engine
            .apply_action_at(&pending_listing(), &request(AdminAction::Expire), now)
            .unwrap();

        let later = now + Duration::minutes(5);
        let approved = engine
            .apply_action_at(&expired, &request(AdminAction::Approve), later)
            .unwrap();
        assert_eq!(
            approved.state,
            EntityState::Listing {
                status: ListingStatus::Approved,
                expires_at: None,
                featured: false,
            }
        );

        // A future date set while expired survives the override
        let extended = engine
            .apply_action_at(
                &expired,
                &request(AdminAction::AdjustExpiration).with_payload(ActionPayload {
                    days: Some(10),
                    ..Default::default()
                }),
                later,
            )
            .unwrap();
        let hidden = engine
            .apply_action_at(&extended, &request(AdminAction::Hide), later)
            .unwrap();
        match hidden.state {
            EntityState::Listing { expires_at, .. } => {
                assert_eq!(expires_at, Some(later + Duration::days(10)))
            }
            _ => panic!("expected listing"),
        }
    }

    #[test]
    fn test_adjust_expiration() {
        let engine = StatusTransitionEngine::default();
        let now = Utc::now();
        let listing = pending_listing();

        let extend = request(AdminAction::AdjustExpiration).with_payload(ActionPayload {
            days: Some(30),
            ..Default::default()
        });
        let updated = engine.apply_action_at(&listing, &extend, now).unwrap();
        assert_eq!(updated.status_str(), "pending");
        assert_eq!(
            updated.state,
            EntityState::Listing {
                status: ListingStatus::Pending,
                expires_at: Some(now + Duration::days(30)),
                featured: false,
            }
        );

        for days in [Some(0), Some(-3), None] {
            let collapse = request(AdminAction::AdjustExpiration).with_payload(ActionPayload {
                days,
                ..Default::default()
            });
            let updated = engine.apply_action_at(&listing, &collapse, now).unwrap();
            assert_eq!(updated.status_str(), "expired");
            assert_eq!(updated.audit_log.last().unwrap().action, "expired");
        }
    }

    #[test]
    fn test_account_actions_on_listing_are_unknown() {
        let engine = StatusTransitionEngine::default();
        let err = engine
            .apply_action(&pending_listing(), &request(AdminAction::Restore))
            .unwrap_err();
        match err {
            ModerationError::UnknownAction { action, kind } => {
                assert_eq!(action, "restore");
                assert_eq!(kind, Some(EntityKind::Listing));
            }
            other => panic!("unexpected error: {other}"),
        }

        let account = ModeratableEntity::new_account("user-1").unwrap();
        assert!(engine.apply_action(&account, &request(AdminAction::Approve)).is_err());
        assert!(engine
            .apply_named(&account, "impersonate", "admin-1", ActionPayload::default())
            .is_err());
    }

    #[test]
    fn test_suspend_and_restore() {
        let engine = StatusTransitionEngine::default();
        let now = Utc::now();
        let account = ModeratableEntity::new_account("user-1").unwrap();

        let suspend = request(AdminAction::Suspend).with_payload(ActionPayload {
            reason: Some("policy violation".into()),
            duration: Some("7 days".into()),
            ..Default::default()
        });
        let suspended = engine.apply_action_at(&account, &suspend, now).unwrap();
        assert_eq!(
            suspended.state,
            EntityState::Account {
                status: AccountStatus::Suspended,
                suspended_until: Some(now + Duration::days(7)),
            }
        );
        let note = suspended.audit_log.last().unwrap().note.clone().unwrap();
        assert!(note.contains("policy violation"));
        assert!(note.contains("7 days"));

        let restored = engine
            .apply_action(&suspended, &request(AdminAction::Restore))
            .unwrap();
        assert_eq!(restored.status_str(), "Active");
        assert_eq!(restored.audit_log.len(), 2);
    }

    #[test]
    fn test_suspend_rejects_bad_duration() {
        let engine = StatusTransitionEngine::default();
        let account = ModeratableEntity::new_account("user-1").unwrap();
        let suspend = request(AdminAction::Suspend).with_payload(ActionPayload {
            reason: Some("spam".into()),
            duration: Some("a while".into()),
            ..Default::default()
        });
        assert!(matches!(
            engine.apply_action(&account, &suspend).unwrap_err(),
            ModerationError::InvalidPayload(_)
        ));
    }

    #[test]
    fn test_noop_policy() {
        let now = Utc::now();
        let approved = StatusTransitionEngine::default()
            .apply_action_at(&pending_listing(), &request(AdminAction::Approve), now)
            .unwrap();

        // Default policy records re-approval
        let again = StatusTransitionEngine::default()
            .apply_action_at(&approved, &request(AdminAction::Approve), now)
            .unwrap();
        assert_eq!(again.audit_log.len(), 2);

        let strict = StatusTransitionEngine::new(AuditPolicy::SkipNoOps);
        assert!(!strict.would_change(&approved, &request(AdminAction::Approve), now).unwrap());
        assert!(matches!(
            strict.apply_action_at(&approved, &request(AdminAction::Approve), now),
            Err(ModerationError::NoOpTransition { .. })
        ));

        // Toggles always change something
        assert!(strict.apply_action_at(&approved, &request(AdminAction::Feature), now).is_ok());
    }

    #[test]
    fn test_unfeature_only_clears() {
        let now = Utc::now();
        let listing = pending_listing();

        let recorded = StatusTransitionEngine::default()
            .apply_action_at(&listing, &request(AdminAction::Unfeature), now)
            .unwrap();
        assert_eq!(
            recorded.state,
            EntityState::Listing {
                status: ListingStatus::Pending,
                expires_at: None,
                featured: false,
            }
        );
        assert_eq!(recorded.audit_log.last().unwrap().action, "unfeatured");

        let strict = StatusTransitionEngine::new(AuditPolicy::SkipNoOps);
        assert!(matches!(
            strict.apply_action_at(&listing, &request(AdminAction::Unfeature), now),
            Err(ModerationError::NoOpTransition { .. })
        ));

        let featured = strict
            .apply_action_at(&listing, &request(AdminAction::Feature), now)
            .unwrap();
        let cleared = strict
            .apply_action_at(&featured, &request(AdminAction::Unfeature), now)
            .unwrap();
        assert!(matches!(
            cleared.state,
            EntityState::Listing { featured: false, .. }
        ));
        assert_eq!(cleared.audit_log.len(), 2);
    }

    #[test]
    fn test_audit_policy_from_str() {
        assert_eq!(AuditPolicy::from_str("record-all").unwrap(), AuditPolicy::RecordAll);
        assert_eq!(AuditPolicy::from_str("SKIP-NOOPS").unwrap(), AuditPolicy::SkipNoOps);
        assert!(AuditPolicy::from_str("sometimes").is_err());
    }
}
