/// Moderatable entities: listings and user accounts
use crate::error::{ModerationError, ModerationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity type subject to moderation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Listing,
    Account,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Listing => "listing",
            EntityKind::Account => "account",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "listing" => Ok(EntityKind::Listing),
            "account" | "user" => Ok(EntityKind::Account),
            _ => Err(ModerationError::Validation(format!("Invalid entity kind: {}", s))),
        }
    }
}

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    NeedsEdits,
    Hidden,
    Expired,
    Duplicate,
    Impersonated,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
            ListingStatus::NeedsEdits => "needs-edits",
            ListingStatus::Hidden => "hidden",
            ListingStatus::Expired => "expired",
            ListingStatus::Duplicate => "duplicate",
            ListingStatus::Impersonated => "impersonated",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ListingStatus::Draft),
            "pending" => Ok(ListingStatus::Pending),
            "approved" => Ok(ListingStatus::Approved),
            "rejected" => Ok(ListingStatus::Rejected),
            "needs-edits" => Ok(ListingStatus::NeedsEdits),
            "hidden" => Ok(ListingStatus::Hidden),
            "expired" => Ok(ListingStatus::Expired),
            "duplicate" => Ok(ListingStatus::Duplicate),
            "impersonated" => Ok(ListingStatus::Impersonated),
            _ => Err(ModerationError::Validation(format!("Invalid listing status: {}", s))),
        }
    }
}

/// User account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Suspended => "Suspended",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            _ => Err(ModerationError::Validation(format!("Invalid account status: {}", s))),
        }
    }
}

/// Kind-specific moderation state. The status enum of each variant is the
/// declared state set for that kind, so an undeclared status cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityState {
    Listing {
        status: ListingStatus,
        expires_at: Option<DateTime<Utc>>,
        featured: bool,
    },
    Account {
        status: AccountStatus,
        /// None while suspended means indefinite
        suspended_until: Option<DateTime<Utc>>,
    },
}

impl EntityState {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityState::Listing { .. } => EntityKind::Listing,
            EntityState::Account { .. } => EntityKind::Account,
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            EntityState::Listing { status, .. } => status.as_str(),
            EntityState::Account { status, .. } => status.as_str(),
        }
    }
}

/// A single admin action recorded against an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl AuditEntry {
    /// Blank notes are stored as absent.
    pub fn new(
        action: impl Into<String>,
        actor: impl Into<String>,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self {
            action: action.into(),
            actor: actor.into(),
            timestamp,
            note: note.filter(|n| !n.trim().is_empty()),
        }
    }
}

impl std::fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.actor,
            self.action
        )?;
        if let Some(note) = &self.note {
            write!(f, ": {}", note)?;
        }
        Ok(())
    }
}

/// Append-only audit trail. Existing entries cannot be changed through this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog(Vec<AuditEntry>);

impl AuditLog {
    pub(crate) fn from_entries(entries: Vec<AuditEntry>) -> Self {
        Self(entries)
    }

    pub(crate) fn append(&mut self, entry: AuditEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.0.last()
    }
}

/// A listing or user account subject to admin-driven status changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratableEntity {
    pub id: String,
    pub owner_id: String,
    pub state: EntityState,
    pub audit_log: AuditLog,
    /// Incremented once per applied transition; used for optimistic concurrency
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl ModeratableEntity {
    /// Create a listing in its initial status (draft or pending)
    pub fn new_listing(owner_id: &str, initial: ListingStatus) -> ModerationResult<Self> {
        Self::listing_with_id(&Uuid::new_v4().to_string(), owner_id, initial)
    }

    pub fn listing_with_id(
        id: &str,
        owner_id: &str,
        initial: ListingStatus,
    ) -> ModerationResult<Self> {
        if !matches!(initial, ListingStatus::Draft | ListingStatus::Pending) {
            return Err(ModerationError::Validation(format!(
                "Listings must start as draft or pending, not {}",
                initial.as_str()
            )));
        }
        if owner_id.trim().is_empty() {
            return Err(ModerationError::Validation("Owner id cannot be empty".to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            state: EntityState::Listing {
                status: initial,
                expires_at: None,
                featured: false,
            },
            audit_log: AuditLog::default(),
            version: 0,
            created_at: Utc::now(),
        })
    }

    /// Create an active account. An account is its own owner.
    pub fn new_account(account_id: &str) -> ModerationResult<Self> {
        if account_id.trim().is_empty() {
            return Err(ModerationError::Validation("Account id cannot be empty".to_string()));
        }

        Ok(Self {
            id: account_id.to_string(),
            owner_id: account_id.to_string(),
            state: EntityState::Account {
                status: AccountStatus::Active,
                suspended_until: None,
            },
            audit_log: AuditLog::default(),
            version: 0,
            created_at: Utc::now(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.state.kind()
    }

    pub fn status_str(&self) -> &'static str {
        self.state.status_str()
    }

    pub fn is_featured(&self) -> bool {
        matches!(self.state, EntityState::Listing { featured: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(ListingStatus::from_str("needs-edits").unwrap(), ListingStatus::NeedsEdits);
        assert_eq!(ListingStatus::from_str("APPROVED").unwrap(), ListingStatus::Approved);
        assert!(ListingStatus::from_str("archived").is_err());

        assert_eq!(AccountStatus::from_str("Suspended").unwrap(), AccountStatus::Suspended);
        assert!(AccountStatus::from_str("banned").is_err());
    }

    #[test]
    fn test_listing_initial_status() {
        let listing = ModeratableEntity::new_listing("owner-1", ListingStatus::Pending).unwrap();
        assert_eq!(listing.kind(), EntityKind::Listing);
        assert_eq!(listing.status_str(), "pending");
        assert!(listing.audit_log.is_empty());
        assert_eq!(listing.version, 0);

        assert!(ModeratableEntity::new_listing("owner-1", ListingStatus::Approved).is_err());
        assert!(ModeratableEntity::new_listing("  ", ListingStatus::Draft).is_err());
    }

    #[test]
    fn test_account_owns_itself() {
        let account = ModeratableEntity::new_account("user-7").unwrap();
        assert_eq!(account.owner_id, "user-7");
        assert_eq!(account.status_str(), "Active");
    }

    #[test]
    fn test_audit_entry_blank_note_is_absent() {
        let entry = AuditEntry::new("approved", "admin", Utc::now(), Some("   ".to_string()));
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_state_serializes_with_kind_tag() {
        let listing = ModeratableEntity::listing_with_id("l-1", "o-1", ListingStatus::Draft).unwrap();
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["state"]["kind"], "listing");
        assert_eq!(json["state"]["status"], "draft");
    }
}
