/// Bulk action coordinator
///
/// Fans one admin action out over a selection of entity ids. Items are
/// processed in selection order and independently: a failing item is
/// reported in `BulkResult::failed` and never aborts the rest of the batch.
use super::action::{ActionPayload, ActionRequest, AdminAction};
use super::engine::StatusTransitionEngine;
use super::entity::ModeratableEntity;
use crate::error::{ModerationError, ModerationResult};
use crate::store::EntityRepository;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Supplies the payload for each entity in a batch
#[derive(Clone)]
pub enum PayloadResolver {
    /// Same payload for every entity
    Constant(ActionPayload),
    /// Payload chosen by the entity's owner id
    PerOwner(Arc<dyn Fn(&str) -> ActionPayload + Send + Sync>),
}

impl PayloadResolver {
    pub fn constant(payload: ActionPayload) -> Self {
        PayloadResolver::Constant(payload)
    }

    pub fn per_owner<F>(resolve: F) -> Self
    where
        F: Fn(&str) -> ActionPayload + Send + Sync + 'static,
    {
        PayloadResolver::PerOwner(Arc::new(resolve))
    }

    /// One comment per owner becomes that owner's rejection reason. Owners
    /// without a comment get an empty payload, which fails justification.
    pub fn from_owner_comments(comments: HashMap<String, String>) -> Self {
        Self::per_owner(move |owner_id| match comments.get(owner_id) {
            Some(comment) => ActionPayload::with_reason(comment.clone()),
            None => ActionPayload::default(),
        })
    }

    pub fn resolve(&self, owner_id: &str) -> ActionPayload {
        match self {
            PayloadResolver::Constant(payload) => payload.clone(),
            PayloadResolver::PerOwner(resolve) => resolve(owner_id),
        }
    }
}

impl fmt::Debug for PayloadResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadResolver::Constant(payload) => f.debug_tuple("Constant").field(payload).finish(),
            PayloadResolver::PerOwner(_) => f.write_str("PerOwner(..)"),
        }
    }
}

/// One item that could not be processed
#[derive(Debug)]
pub struct BulkFailure {
    pub id: String,
    pub error: ModerationError,
}

/// Per-item outcome of a bulk action
#[derive(Debug, Default)]
pub struct BulkResult {
    pub succeeded: Vec<ModeratableEntity>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// e.g. "3 succeeded, 1 failed"
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded_count(),
            self.failed_count()
        )
    }
}

/// Applies one action across a selection through a repository
#[derive(Clone)]
pub struct BulkActionCoordinator {
    engine: StatusTransitionEngine,
    repository: Arc<dyn EntityRepository>,
    item_timeout: Option<Duration>,
}

impl BulkActionCoordinator {
    pub fn new(engine: StatusTransitionEngine, repository: Arc<dyn EntityRepository>) -> Self {
        Self {
            engine,
            repository,
            item_timeout: None,
        }
    }

    /// Bound the time spent reading and planning each item. The save is never
    /// cut short, so an item reported as `Timeout` was not written.
    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &StatusTransitionEngine {
        &self.engine
    }

    /// Apply `action` to every id. An empty selection fails before any
    /// entity is read.
    pub async fn apply_bulk(
        &self,
        ids: &[String],
        action: AdminAction,
        actor: &str,
        resolver: &PayloadResolver,
    ) -> ModerationResult<BulkResult> {
        if ids.is_empty() {
            return Err(ModerationError::EmptySelection);
        }

        let mut result = BulkResult::default();
        for id in ids {
            match self.apply_item(id, action, actor, resolver).await {
                Ok(updated) => result.succeeded.push(updated),
                Err(error) => result.failed.push(BulkFailure {
                    id: id.clone(),
                    error,
                }),
            }
        }

        Ok(result)
    }

    async fn apply_item(
        &self,
        id: &str,
        action: AdminAction,
        actor: &str,
        resolver: &PayloadResolver,
    ) -> ModerationResult<ModeratableEntity> {
        let plan = async {
            let entity = self
                .repository
                .get(id)
                .await?
                .ok_or_else(|| ModerationError::EntityNotFound(id.to_string()))?;

            let request = ActionRequest::new(action, actor).with_payload(resolver.resolve(&entity.owner_id));
            self.engine.apply_action(&entity, &request)
        };

        let updated = match self.item_timeout {
            Some(limit) => tokio::time::timeout(limit, plan)
                .await
                .map_err(|_| ModerationError::Timeout {
                    id: id.to_string(),
                    after: limit,
                })??,
            None => plan.await?,
        };

        // Not under the timeout: a dropped save could still commit and be misreported
        self.repository.save(&updated).await?;
        Ok(updated)
    }
}
