/// Entity registration
///
/// Called by the marketplace when a listing is submitted or an account is
/// created, so that it becomes subject to moderation.
use crate::{
    context::AppContext,
    error::{ModerationError, ModerationResult},
    moderation::{EntityKind, ListingStatus, ModeratableEntity},
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/entities", post(register_entity))
}

#[derive(Debug, Deserialize)]
pub struct RegisterEntityRequest {
    pub kind: EntityKind,
    /// Generated for listings when absent; required for accounts
    #[serde(default)]
    pub id: Option<String>,
    /// Required for listings; accounts own themselves
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Initial listing status, "draft" or "pending" (default)
    #[serde(default)]
    pub status: Option<String>,
}

impl RegisterEntityRequest {
    fn into_entity(self) -> ModerationResult<ModeratableEntity> {
        match self.kind {
            EntityKind::Listing => {
                let owner_id = self.owner_id.ok_or_else(|| {
                    ModerationError::Validation("owner_id is required for listings".to_string())
                })?;
                let status = match self.status.as_deref() {
                    Some(status) => ListingStatus::from_str(status)?,
                    None => ListingStatus::Pending,
                };
                match self.id {
                    Some(id) if !id.trim().is_empty() => {
                        ModeratableEntity::listing_with_id(&id, &owner_id, status)
                    }
                    _ => ModeratableEntity::new_listing(&owner_id, status),
                }
            }
            EntityKind::Account => {
                let id = self.id.ok_or_else(|| {
                    ModerationError::Validation("id is required for accounts".to_string())
                })?;
                ModeratableEntity::new_account(&id)
            }
        }
    }
}

async fn register_entity(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterEntityRequest>,
) -> ModerationResult<(StatusCode, Json<ModeratableEntity>)> {
    let entity = ctx.moderation.register(req.into_entity()?).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> RegisterEntityRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_listing_defaults_to_pending() {
        let entity = request(r#"{"kind": "listing", "owner_id": "u-1"}"#)
            .into_entity()
            .unwrap();
        assert_eq!(entity.status_str(), "pending");
        assert!(!entity.id.is_empty());
    }

    #[test]
    fn test_listing_rejects_non_initial_status() {
        let err = request(r#"{"kind": "listing", "owner_id": "u-1", "status": "approved"}"#)
            .into_entity()
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));
    }

    #[test]
    fn test_account_requires_id() {
        assert!(request(r#"{"kind": "account"}"#).into_entity().is_err());

        let account = request(r#"{"kind": "account", "id": "u-7"}"#)
            .into_entity()
            .unwrap();
        assert_eq!(account.owner_id, "u-7");
        assert_eq!(account.status_str(), "Active");
    }
}
