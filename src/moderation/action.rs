/// Admin actions and their payloads
use super::entity::EntityKind;
use crate::error::{ModerationError, ModerationResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Admin action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAction {
    Approve,
    /// Requires a reason or note
    Reject,
    RequestEdits,
    Hide,
    Expire,
    /// `days <= 0` (or absent) behaves like `Expire`
    AdjustExpiration,
    /// Toggles the featured flag; status is unchanged
    Feature,
    /// Clears the featured flag; a no-op on a listing that is not featured
    Unfeature,
    MarkDuplicate,
    /// Requires a reason or note
    Suspend,
    Restore,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Approve => "approve",
            AdminAction::Reject => "reject",
            AdminAction::RequestEdits => "request-edits",
            AdminAction::Hide => "hide",
            AdminAction::Expire => "expire",
            AdminAction::AdjustExpiration => "adjust-expiration",
            AdminAction::Feature => "feature",
            AdminAction::Unfeature => "unfeature",
            AdminAction::MarkDuplicate => "mark-duplicate",
            AdminAction::Suspend => "suspend",
            AdminAction::Restore => "restore",
        }
    }

    /// Parse an action name. Unrecognized names are reported against `kind`.
    pub fn parse(s: &str, kind: Option<EntityKind>) -> ModerationResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(AdminAction::Approve),
            "reject" => Ok(AdminAction::Reject),
            "request-edits" => Ok(AdminAction::RequestEdits),
            "hide" => Ok(AdminAction::Hide),
            "expire" => Ok(AdminAction::Expire),
            "adjust-expiration" => Ok(AdminAction::AdjustExpiration),
            "feature" => Ok(AdminAction::Feature),
            "unfeature" => Ok(AdminAction::Unfeature),
            "mark-duplicate" => Ok(AdminAction::MarkDuplicate),
            "suspend" => Ok(AdminAction::Suspend),
            "restore" => Ok(AdminAction::Restore),
            _ => Err(ModerationError::UnknownAction {
                action: s.to_string(),
                kind,
            }),
        }
    }

    /// Entity kind this action is defined for
    pub fn target_kind(&self) -> EntityKind {
        match self {
            AdminAction::Suspend | AdminAction::Restore => EntityKind::Account,
            _ => EntityKind::Listing,
        }
    }

    pub fn applies_to(&self, kind: EntityKind) -> bool {
        self.target_kind() == kind
    }

    pub fn requires_justification(&self) -> bool {
        matches!(self, AdminAction::Reject | AdminAction::Suspend)
    }

    /// Verb used in admin notices, e.g. "3 approved, 1 failed"
    pub fn past_tense(&self) -> &'static str {
        match self {
            AdminAction::Approve => "approved",
            AdminAction::Reject => "rejected",
            AdminAction::RequestEdits => "sent back for edits",
            AdminAction::Hide => "hidden",
            AdminAction::Expire => "expired",
            AdminAction::AdjustExpiration => "updated",
            AdminAction::Feature => "toggled featured",
            AdminAction::Unfeature => "unfeatured",
            AdminAction::MarkDuplicate => "marked duplicate",
            AdminAction::Suspend => "suspended",
            AdminAction::Restore => "restored",
        }
    }
}

/// Optional inputs captured by admin dialogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Suspension length, e.g. "7 days" or "permanent"
    #[serde(default)]
    pub duration: Option<String>,
    /// Expiration adjustment in days from now
    #[serde(default)]
    pub days: Option<i64>,
}

impl ActionPayload {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn with_note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Default::default()
        }
    }

    /// Trimmed reason and note combined; None when both are blank
    pub fn justification(&self) -> Option<String> {
        let reason = self.reason.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let note = self.note.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (reason, note) {
            (Some(reason), Some(note)) => Some(format!("{}: {}", reason, note)),
            (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
            (None, None) => None,
        }
    }
}

/// A fully specified action request against one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: AdminAction,
    pub actor: String,
    #[serde(default)]
    pub payload: ActionPayload,
}

impl ActionRequest {
    pub fn new(action: AdminAction, actor: impl Into<String>) -> Self {
        Self {
            action,
            actor: actor.into(),
            payload: ActionPayload::default(),
        }
    }

    pub fn with_payload(mut self, payload: ActionPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Parse a suspension duration. `Ok(None)` means indefinite.
pub fn parse_suspension_duration(input: &str) -> ModerationResult<Option<Duration>> {
    let text = input.trim().to_lowercase();
    if matches!(text.as_str(), "permanent" | "indefinite" | "forever") {
        return Ok(None);
    }

    let invalid = || ModerationError::InvalidPayload(format!("Invalid suspension duration: {}", input));

    let mut parts = text.split_whitespace();
    let amount: i64 = parts
        .next()
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .ok_or_else(invalid)?;
    let unit = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let duration = match unit.trim_end_matches('s') {
        "hour" => Duration::try_hours(amount),
        "day" => Duration::try_days(amount),
        "week" => Duration::try_weeks(amount),
        "month" => amount.checked_mul(30).and_then(Duration::try_days),
        _ => return Err(invalid()),
    };

    duration.map(Some).ok_or_else(invalid)
}
