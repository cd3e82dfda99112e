/// Owner lookup and the per-owner rejection comment sheet
use super::entity::ModeratableEntity;
use crate::error::{ModerationError, ModerationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Display details for an entity owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity collaborator resolving owner ids to display details
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn lookup_owner(&self, owner_id: &str) -> ModerationResult<Option<OwnerProfile>>;
}

/// Owner directory backed by a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryOwnerDirectory {
    owners: HashMap<String, OwnerProfile>,
}

impl InMemoryOwnerDirectory {
    pub fn new(owners: impl IntoIterator<Item = OwnerProfile>) -> Self {
        Self {
            owners: owners.into_iter().map(|o| (o.id.clone(), o)).collect(),
        }
    }

    /// Load a JSON array of owner profiles
    pub async fn from_json_file(path: &Path) -> ModerationResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let owners: Vec<OwnerProfile> = serde_json::from_str(&raw).map_err(|e| {
            ModerationError::Validation(format!(
                "Invalid owner directory {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(owners))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[async_trait]
impl OwnerDirectory for InMemoryOwnerDirectory {
    async fn lookup_owner(&self, owner_id: &str) -> ModerationResult<Option<OwnerProfile>> {
        Ok(self.owners.get(owner_id).cloned())
    }
}

/// One row of the bulk-rejection dialog: a distinct owner and the selected
/// entities they own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerCommentRow {
    pub owner: OwnerProfile,
    pub entity_ids: Vec<String>,
}

/// Distinct owner ids of a selection, in first-seen order
pub fn distinct_owners(selection: &[ModeratableEntity]) -> Vec<String> {
    let mut owners: Vec<String> = Vec::new();
    for entity in selection {
        if !owners.contains(&entity.owner_id) {
            owners.push(entity.owner_id.clone());
        }
    }
    owners
}

/// Build one comment row per distinct owner in the selection. Owners the
/// directory does not know are shown by id.
pub async fn owner_comment_sheet(
    selection: &[ModeratableEntity],
    directory: &dyn OwnerDirectory,
) -> ModerationResult<Vec<OwnerCommentRow>> {
    let mut rows = Vec::new();

    for owner_id in distinct_owners(selection) {
        let owner = directory
            .lookup_owner(&owner_id)
            .await?
            .unwrap_or_else(|| OwnerProfile {
                id: owner_id.clone(),
                name: owner_id.clone(),
                email: None,
            });

        let entity_ids = selection
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.id.clone())
            .collect();

        rows.push(OwnerCommentRow { owner, entity_ids });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::ListingStatus;

    fn listing(id: &str, owner: &str) -> ModeratableEntity {
        ModeratableEntity::listing_with_id(id, owner, ListingStatus::Pending).unwrap()
    }

    #[test]
    fn test_distinct_owners_keep_selection_order() {
        let selection = vec![
            listing("l-1", "carol"),
            listing("l-2", "alice"),
            listing("l-3", "carol"),
        ];
        assert_eq!(distinct_owners(&selection), vec!["carol", "alice"]);
    }

    #[tokio::test]
    async fn test_comment_sheet() {
        let directory = InMemoryOwnerDirectory::new([OwnerProfile {
            id: "carol".into(),
            name: "SSG Carol Diaz".into(),
            email: Some("carol@example.mil".into()),
        }]);
        let selection = vec![
            listing("l-1", "carol"),
            listing("l-2", "dave"),
            listing("l-3", "carol"),
        ];

        let rows = owner_comment_sheet(&selection, &directory).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].owner.name, "SSG Carol Diaz");
        assert_eq!(rows[0].entity_ids, vec!["l-1", "l-3"]);
        assert_eq!(rows[1].owner.name, "dave");
        assert_eq!(rows[1].owner.email, None);
    }

    #[tokio::test]
    async fn test_directory_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owners.json");
        std::fs::write(
            &path,
            r#"[{"id": "u-1", "name": "Pat", "email": "pat@example.com"}, {"id": "u-2", "name": "Sam"}]"#,
        )
        .unwrap();

        let directory = InMemoryOwnerDirectory::from_json_file(&path).await.unwrap();
        assert_eq!(directory.len(), 2);
        let sam = directory.lookup_owner("u-2").await.unwrap().unwrap();
        assert_eq!(sam.email, None);

        std::fs::write(&path, "not json").unwrap();
        assert!(InMemoryOwnerDirectory::from_json_file(&path).await.is_err());
    }
}
