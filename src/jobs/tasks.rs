/// Background task implementations
use crate::{
    error::ModerationResult,
    moderation::{
        AccountStatus, ActionPayload, AdminAction, EntityKind, EntityState, ListingStatus,
        ModeratableEntity, PayloadResolver,
    },
    service::ModerationService,
    store::EntityFilter,
};
use chrono::{DateTime, Utc};

pub const EXPIRATION_NOTE: &str = "Expiration date reached";
pub const SUSPENSION_ENDED_NOTE: &str = "Suspension period ended";

/// Outcome of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
}

fn is_overdue_listing(entity: &ModeratableEntity, now: DateTime<Utc>) -> bool {
    match &entity.state {
        EntityState::Listing {
            status,
            expires_at: Some(expires_at),
            ..
        } => *status != ListingStatus::Expired && *expires_at <= now,
        _ => false,
    }
}

fn is_lapsed_suspension(entity: &ModeratableEntity, now: DateTime<Utc>) -> bool {
    matches!(
        &entity.state,
        EntityState::Account {
            status: AccountStatus::Suspended,
            suspended_until: Some(until),
        } if *until <= now
    )
}

async fn sweep(
    service: &ModerationService,
    kind: EntityKind,
    action: AdminAction,
    note: &str,
    actor: &str,
    due: impl Fn(&ModeratableEntity) -> bool,
) -> ModerationResult<SweepReport> {
    let ids: Vec<String> = service
        .list(&EntityFilter::kind(kind))
        .await?
        .into_iter()
        .filter(|entity| due(entity))
        .map(|entity| entity.id)
        .collect();

    if ids.is_empty() {
        return Ok(SweepReport::default());
    }

    let resolver = PayloadResolver::constant(ActionPayload::with_note(note));
    let result = service.apply_bulk(&ids, action, actor, &resolver).await?;

    Ok(SweepReport {
        processed: result.succeeded_count(),
        failed: result.failed_count(),
    })
}

/// Expire listings whose expiration date has passed
pub async fn expire_overdue_listings(
    service: &ModerationService,
    actor: &str,
    now: DateTime<Utc>,
) -> ModerationResult<SweepReport> {
    sweep(
        service,
        EntityKind::Listing,
        AdminAction::Expire,
        EXPIRATION_NOTE,
        actor,
        |entity| is_overdue_listing(entity, now),
    )
    .await
}

/// Restore accounts whose timed suspension has ended. Indefinite
/// suspensions are left alone.
pub async fn restore_lapsed_suspensions(
    service: &ModerationService,
    actor: &str,
    now: DateTime<Utc>,
) -> ModerationResult<SweepReport> {
    sweep(
        service,
        EntityKind::Account,
        AdminAction::Restore,
        SUSPENSION_ENDED_NOTE,
        actor,
        |entity| is_lapsed_suspension(entity, now),
    )
    .await
}
