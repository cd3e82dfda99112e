/// Moderation service
///
/// Entry point used by the admin API and background jobs. Wraps the
/// repository, transition engine, bulk coordinator and owner directory, and
/// is where moderation activity is logged and counted.
use crate::error::{ModerationError, ModerationResult};
use crate::metrics;
use crate::moderation::{
    owner_comment_sheet, ActionRequest, AdminAction, BulkActionCoordinator, BulkResult,
    ModeratableEntity, OwnerCommentRow, OwnerDirectory, PayloadResolver, StatusTransitionEngine,
};
use crate::store::{EntityFilter, EntityRepository};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Severity of an admin notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Short message shown to the admin after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn for_action(entity: &ModeratableEntity) -> Self {
        let action = entity
            .audit_log
            .last()
            .map(|entry| entry.action.as_str())
            .unwrap_or("updated");

        Notice {
            level: NoticeLevel::Success,
            message: format!("{} {} {}", capitalize(entity.kind().as_str()), entity.id, action),
        }
    }

    pub fn for_bulk(action: AdminAction, result: &BulkResult) -> Self {
        let level = if result.is_complete_success() {
            NoticeLevel::Success
        } else if result.succeeded_count() > 0 {
            NoticeLevel::Warning
        } else {
            NoticeLevel::Error
        };

        let mut message = format!("{} {}", result.succeeded_count(), action.past_tense());
        if result.failed_count() > 0 {
            message.push_str(&format!(", {} failed", result.failed_count()));
        }

        Notice { level, message }
    }

    pub fn for_error(error: &ModerationError) -> Self {
        match error {
            ModerationError::EmptySelection => Notice {
                level: NoticeLevel::Warning,
                message: "No items selected".to_string(),
            },
            other => Notice {
                level: NoticeLevel::Error,
                message: other.public_message(),
            },
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Moderation service
#[derive(Clone)]
pub struct ModerationService {
    repository: Arc<dyn EntityRepository>,
    coordinator: BulkActionCoordinator,
    owners: Arc<dyn OwnerDirectory>,
}

impl ModerationService {
    pub fn new(
        repository: Arc<dyn EntityRepository>,
        engine: StatusTransitionEngine,
        owners: Arc<dyn OwnerDirectory>,
    ) -> Self {
        let coordinator = BulkActionCoordinator::new(engine, Arc::clone(&repository));
        Self {
            repository,
            coordinator,
            owners,
        }
    }

    /// Bound each entity of a bulk action independently
    pub fn with_bulk_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.coordinator = self.coordinator.with_item_timeout(timeout);
        self
    }

    pub fn engine(&self) -> &StatusTransitionEngine {
        self.coordinator.engine()
    }

    /// Add a new entity to moderation
    pub async fn register(&self, entity: ModeratableEntity) -> ModerationResult<ModeratableEntity> {
        if self.repository.get(&entity.id).await?.is_some() {
            return Err(ModerationError::Conflict(format!(
                "Entity {} is already registered",
                entity.id
            )));
        }

        self.repository.save(&entity).await?;
        info!(
            entity_id = %entity.id,
            kind = entity.kind().as_str(),
            status = entity.status_str(),
            "Registered entity for moderation"
        );

        Ok(entity)
    }

    pub async fn get(&self, id: &str) -> ModerationResult<ModeratableEntity> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| ModerationError::EntityNotFound(id.to_string()))
    }

    pub async fn list(&self, filter: &EntityFilter) -> ModerationResult<Vec<ModeratableEntity>> {
        self.repository.list(filter).await
    }

    /// Apply one admin action to one entity and persist the result
    pub async fn apply_action(
        &self,
        id: &str,
        request: &ActionRequest,
    ) -> ModerationResult<ModeratableEntity> {
        let action = request.action.as_str();

        let entity = match self.get(id).await {
            Ok(entity) => entity,
            Err(e) => {
                metrics::record_moderation_action("unknown", action, e.code());
                return Err(e);
            }
        };
        let kind = entity.kind().as_str();

        let result = match self.engine().apply_action(&entity, request) {
            Ok(updated) => self.repository.save(&updated).await.map(|_| updated),
            Err(e) => Err(e),
        };

        match &result {
            Ok(updated) => {
                metrics::record_moderation_action(kind, action, "success");
                info!(
                    entity_id = %id,
                    actor = %request.actor,
                    action,
                    from = entity.status_str(),
                    to = updated.status_str(),
                    "Applied moderation action"
                );
            }
            Err(e) => {
                metrics::record_moderation_action(kind, action, e.code());
                warn!(
                    entity_id = %id,
                    actor = %request.actor,
                    action,
                    "Moderation action failed: {}",
                    e
                );
            }
        }

        result
    }

    /// Apply one action across a selection; see `BulkActionCoordinator`
    pub async fn apply_bulk(
        &self,
        ids: &[String],
        action: AdminAction,
        actor: &str,
        resolver: &PayloadResolver,
    ) -> ModerationResult<BulkResult> {
        let result = match self.coordinator.apply_bulk(ids, action, actor, resolver).await {
            Ok(result) => result,
            Err(e) => {
                debug!(action = action.as_str(), actor, "Bulk action rejected: {}", e);
                return Err(e);
            }
        };

        metrics::record_bulk_action(
            action.as_str(),
            ids.len(),
            result.failed.iter().map(|f| f.error.code()),
        );
        for entity in &result.succeeded {
            metrics::record_moderation_action(entity.kind().as_str(), action.as_str(), "success");
        }
        for failure in &result.failed {
            warn!(
                entity_id = %failure.id,
                action = action.as_str(),
                actor,
                "Bulk item failed: {}",
                failure.error
            );
        }

        info!(
            action = action.as_str(),
            actor,
            selected = ids.len(),
            "Bulk action finished: {}",
            result.summary()
        );

        Ok(result)
    }

    /// Comment rows for the bulk-reject dialog, one per distinct owner.
    /// Ids that do not resolve are left out; they fail when the rejection runs.
    pub async fn reject_sheet(&self, ids: &[String]) -> ModerationResult<Vec<OwnerCommentRow>> {
        if ids.is_empty() {
            return Err(ModerationError::EmptySelection);
        }

        let mut selection = Vec::with_capacity(ids.len());
        for id in ids {
            match self.repository.get(id).await? {
                Some(entity) => selection.push(entity),
                None => debug!(entity_id = %id, "Skipping unknown id in reject sheet"),
            }
        }

        owner_comment_sheet(&selection, self.owners.as_ref()).await
    }

    /// Reject a selection, using each owner's comment as the reason
    pub async fn bulk_reject_with_comments(
        &self,
        ids: &[String],
        actor: &str,
        comments: HashMap<String, String>,
    ) -> ModerationResult<BulkResult> {
        let resolver = PayloadResolver::from_owner_comments(comments);
        self.apply_bulk(ids, AdminAction::Reject, actor, &resolver)
            .await
    }
}
