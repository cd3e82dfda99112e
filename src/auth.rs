/// Admin identity extractor
use crate::{context::AppContext, error::ModerationError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Header carrying the acting admin's id, set by the fronting gateway
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Authenticated admin - the id is recorded as the actor of every action
#[derive(Debug, Clone)]
pub struct AdminActor {
    pub id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminActor {
    type Rejection = ModerationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ADMIN_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ModerationError::Authentication("Missing admin id".to_string()))?;

        if !state.config.is_admin(id) {
            tracing::warn!("Rejected admin request from {}", id);
            return Err(ModerationError::Authorization(format!(
                "{} is not an administrator",
                id
            )));
        }

        tracing::debug!("AdminActor: {}", id);

        Ok(AdminActor { id: id.to_string() })
    }
}
