/// Unified error types for the moderation core
use crate::moderation::EntityKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for moderation operations
#[derive(Error, Debug)]
pub enum ModerationError {
    /// Action name not recognized for the entity type
    #[error("Unknown action '{action}' for {}", describe_kind(.kind))]
    UnknownAction {
        action: String,
        kind: Option<EntityKind>,
    },

    /// Reject/suspend without a reason or note
    #[error("Action '{action}' requires a reason or note")]
    MissingJustification { action: String },

    /// Action would not change the entity and the audit policy skips no-ops
    #[error("Action '{action}' would not change entity in status '{status}'")]
    NoOpTransition { action: String, status: String },

    /// Payload present but unusable (bad duration string, etc.)
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Entity id does not resolve
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Bulk action invoked with no ids
    #[error("No items selected")]
    EmptySelection,

    /// Stale write (optimistic concurrency) or audit log truncation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Per-entity timeout elapsed during a bulk action
    #[error("Timed out after {after:?} while processing {id}")]
    Timeout {
        id: String,
        after: std::time::Duration,
    },

    /// Audit log display line could not be parsed
    #[error("Invalid audit line {line}: {reason}")]
    InvalidAuditLine { line: usize, reason: String },

    /// Validation errors (bad status strings, configuration, request bodies)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_kind(kind: &Option<EntityKind>) -> &'static str {
    match kind {
        Some(kind) => kind.as_str(),
        None => "any entity",
    }
}

impl ModerationError {
    /// Stable machine-readable code, used in API bodies and bulk failure reports
    pub fn code(&self) -> &'static str {
        match self {
            ModerationError::UnknownAction { .. } => "UnknownAction",
            ModerationError::MissingJustification { .. } => "MissingJustification",
            ModerationError::NoOpTransition { .. } => "NoOpTransition",
            ModerationError::InvalidPayload(_) => "InvalidPayload",
            ModerationError::EntityNotFound(_) => "EntityNotFound",
            ModerationError::EmptySelection => "EmptySelection",
            ModerationError::Conflict(_) => "Conflict",
            ModerationError::Timeout { .. } => "Timeout",
            ModerationError::InvalidAuditLine { .. } => "InvalidAuditLine",
            ModerationError::Validation(_) => "InvalidRequest",
            ModerationError::Authentication(_) => "AuthenticationRequired",
            ModerationError::Authorization(_) => "Forbidden",
            ModerationError::Database(_)
            | ModerationError::Migration(_)
            | ModerationError::Io(_)
            | ModerationError::Internal(_) => "InternalServerError",
        }
    }

    /// Message safe to show to an admin
    pub fn public_message(&self) -> String {
        match self {
            ModerationError::Database(_)
            | ModerationError::Migration(_)
            | ModerationError::Io(_)
            | ModerationError::Internal(_) => "Internal server error".to_string(), // Don't leak details
            _ => self.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ModerationError::UnknownAction { .. }
            | ModerationError::MissingJustification { .. }
            | ModerationError::InvalidPayload(_)
            | ModerationError::EmptySelection
            | ModerationError::InvalidAuditLine { .. }
            | ModerationError::Validation(_) => StatusCode::BAD_REQUEST,
            ModerationError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ModerationError::Authorization(_) => StatusCode::FORBIDDEN,
            ModerationError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::NoOpTransition { .. } | ModerationError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            ModerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ModerationError::Database(_)
            | ModerationError::Migration(_)
            | ModerationError::Io(_)
            | ModerationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ModerationError to HTTP response
impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message: self.public_message(),
        });

        (self.status_code(), body).into_response()
    }
}

/// Result type alias for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_action_message_names_kind() {
        let err = ModerationError::UnknownAction {
            action: "suspend".to_string(),
            kind: Some(EntityKind::Listing),
        };
        assert_eq!(err.to_string(), "Unknown action 'suspend' for listing");

        let err = ModerationError::UnknownAction {
            action: "frobnicate".to_string(),
            kind: None,
        };
        assert_eq!(err.to_string(), "Unknown action 'frobnicate' for any entity");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ModerationError::EmptySelection.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ModerationError::EntityNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ModerationError::Conflict("stale".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ModerationError::Internal("boom".into()).public_message(),
            "Internal server error"
        );
    }
}
