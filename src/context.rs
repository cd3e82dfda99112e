/// Application context and dependency injection
use crate::{
    config::ModerationConfig,
    db,
    error::ModerationResult,
    moderation::{InMemoryOwnerDirectory, OwnerDirectory, StatusTransitionEngine},
    service::ModerationService,
    store::{EntityRepository, InMemoryRepository, SqliteRepository},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ModerationConfig>,
    /// Present when entities are stored in SQLite
    pub db: Option<SqlitePool>,
    pub moderation: Arc<ModerationService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ModerationConfig) -> ModerationResult<Self> {
        // Validate configuration
        config.validate()?;

        let (repository, pool): (Arc<dyn EntityRepository>, Option<SqlitePool>) =
            match &config.storage.database {
                Some(path) => {
                    let pool = db::create_pool(path, db::DatabaseOptions::default()).await?;
                    db::run_migrations(&pool).await?;
                    db::test_connection(&pool).await?;
                    info!("Using SQLite entity store at {}", path.display());
                    let repository: Arc<dyn EntityRepository> =
                        Arc::new(SqliteRepository::new(pool.clone()));
                    (repository, Some(pool))
                }
                None => {
                    info!("Using in-memory entity store");
                    let repository: Arc<dyn EntityRepository> = Arc::new(InMemoryRepository::new());
                    (repository, None)
                }
            };

        let owners: Arc<dyn OwnerDirectory> = match &config.storage.owner_directory {
            Some(path) => {
                let directory = InMemoryOwnerDirectory::from_json_file(path).await?;
                info!("Loaded {} owner profiles from {}", directory.len(), path.display());
                Arc::new(directory)
            }
            None => Arc::new(InMemoryOwnerDirectory::default()),
        };

        Ok(Self::with_parts(config, repository, owners, pool))
    }

    /// Assemble a context from already-built collaborators
    pub fn with_parts(
        config: ModerationConfig,
        repository: Arc<dyn EntityRepository>,
        owners: Arc<dyn OwnerDirectory>,
        db: Option<SqlitePool>,
    ) -> Self {
        let engine = StatusTransitionEngine::new(config.policy.audit_policy);
        let moderation = ModerationService::new(repository, engine, owners)
            .with_bulk_item_timeout(config.policy.bulk_item_timeout);

        Self {
            config: Arc::new(config),
            db,
            moderation: Arc::new(moderation),
        }
    }

    /// In-memory context for tests and local tooling
    pub fn in_memory(config: ModerationConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryOwnerDirectory::default()),
            None,
        )
    }
}
