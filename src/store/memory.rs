/// In-memory entity store
use super::{check_successor, EntityFilter, EntityRepository};
use crate::error::ModerationResult;
use crate::moderation::ModeratableEntity;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Entities kept in creation order behind an async lock
#[derive(Default)]
pub struct InMemoryRepository {
    entities: RwLock<Vec<ModeratableEntity>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. with fixtures loaded by the surrounding app
    pub fn with_entities(entities: impl IntoIterator<Item = ModeratableEntity>) -> Self {
        Self {
            entities: RwLock::new(entities.into_iter().collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl EntityRepository for InMemoryRepository {
    async fn get(&self, id: &str) -> ModerationResult<Option<ModeratableEntity>> {
        let entities = self.entities.read().await;
        Ok(entities.iter().find(|e| e.id == id).cloned())
    }

    async fn list(&self, filter: &EntityFilter) -> ModerationResult<Vec<ModeratableEntity>> {
        let entities = self.entities.read().await;
        Ok(entities
            .iter()
            .filter(|e| filter.matches(e))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn save(&self, entity: &ModeratableEntity) -> ModerationResult<()> {
        let mut entities = self.entities.write().await;

        match entities.iter_mut().find(|e| e.id == entity.id) {
            Some(stored) => {
                check_successor(stored, entity)?;
                *stored = entity.clone();
            }
            None => entities.push(entity.clone()),
        }

        Ok(())
    }
}
