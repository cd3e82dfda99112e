/// Entity storage
///
/// The moderation core reads and writes entities only through
/// `EntityRepository`, so the same coordinator runs against the in-memory
/// store used by tests and the SQLite store used by the server.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use crate::error::{ModerationError, ModerationResult};
use crate::moderation::{EntityKind, ModeratableEntity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage seam for moderatable entities
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Fetch one entity by id
    async fn get(&self, id: &str) -> ModerationResult<Option<ModeratableEntity>>;

    /// List entities in creation order
    async fn list(&self, filter: &EntityFilter) -> ModerationResult<Vec<ModeratableEntity>>;

    /// Insert a new entity or store the next version of an existing one.
    ///
    /// An existing entity is only replaced when the stored version is exactly
    /// one behind and the stored audit log is not longer than the new one;
    /// anything else is a `Conflict`.
    async fn save(&self, entity: &ModeratableEntity) -> ModerationResult<()>;
}

/// Listing filter used by admin tables and background sweeps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(default)]
    pub kind: Option<EntityKind>,
    /// Status string as returned by `ModeratableEntity::status_str`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl EntityFilter {
    pub fn kind(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Whether an entity passes every predicate (limit/offset excluded)
    pub fn matches(&self, entity: &ModeratableEntity) -> bool {
        if let Some(kind) = self.kind {
            if entity.kind() != kind {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !entity.status_str().eq_ignore_ascii_case(status) {
                return false;
            }
        }
        if let Some(owner_id) = &self.owner_id {
            if &entity.owner_id != owner_id {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if entity.is_featured() != featured {
                return false;
            }
        }
        true
    }
}

/// Shared optimistic-concurrency check for repository implementations
pub(crate) fn check_successor(
    stored: &ModeratableEntity,
    next: &ModeratableEntity,
) -> ModerationResult<()> {
    if stored.version + 1 != next.version {
        return Err(ModerationError::Conflict(format!(
            "Entity {} is at version {}, cannot store version {}",
            next.id, stored.version, next.version
        )));
    }
    if next.audit_log.len() < stored.audit_log.len()
        || next.audit_log.entries()[..stored.audit_log.len()] != *stored.audit_log.entries()
    {
        return Err(ModerationError::Conflict(format!(
            "Entity {} audit log would be rewritten",
            next.id
        )));
    }
    if next.kind() != stored.kind() || next.owner_id != stored.owner_id {
        return Err(ModerationError::Conflict(format!(
            "Entity {} kind and owner are immutable",
            next.id
        )));
    }
    Ok(())
}
