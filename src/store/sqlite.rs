/// SQLite entity store
use super::{check_successor, EntityFilter, EntityRepository};
use crate::error::{ModerationError, ModerationResult};
use crate::moderation::{
    AccountStatus, AuditEntry, AuditLog, EntityKind, EntityState, ListingStatus,
    ModeratableEntity,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqlitePool, Transaction};

const ENTITY_COLUMNS: &str = "id, kind, status, owner_id, featured, expires_at, suspended_until, version, created_at";

/// Entities and their append-only audit rows in SQLite
#[derive(Clone)]
pub struct SqliteRepository {
    db: SqlitePool,
}

impl SqliteRepository {
    /// Wrap a pool whose migrations have already run
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn hydrate(&self, row: SqliteRow) -> ModerationResult<ModeratableEntity> {
        let mut entity = parse_entity_row(&row)?;
        entity.audit_log = fetch_audit_log(&self.db, &entity.id).await?;
        Ok(entity)
    }

    async fn append_audit_entries(
        tx: &mut Transaction<'_, Sqlite>,
        entity: &ModeratableEntity,
        from: usize,
    ) -> ModerationResult<()> {
        for (position, entry) in entity.audit_log.entries().iter().enumerate().skip(from) {
            sqlx::query(
                r#"
                INSERT INTO moderation_audit_entry (entity_id, position, action, actor, note, timestamp)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entity.id)
            .bind(position as i64)
            .bind(&entry.action)
            .bind(&entry.actor)
            .bind(&entry.note)
            .bind(format_timestamp(&entry.timestamp))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityRepository for SqliteRepository {
    async fn get(&self, id: &str) -> ModerationResult<Option<ModeratableEntity>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM moderated_entity WHERE id = ?",
            ENTITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &EntityFilter) -> ModerationResult<Vec<ModeratableEntity>> {
        let mut sql = format!("SELECT {} FROM moderated_entity WHERE 1 = 1", ENTITY_COLUMNS);
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND lower(status) = lower(?)");
        }
        if filter.owner_id.is_some() {
            sql.push_str(" AND owner_id = ?");
        }
        if filter.featured.is_some() {
            sql.push_str(" AND featured = ?");
        }
        sql.push_str(" ORDER BY seq ASC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(status) = &filter.status {
            query = query.bind(status);
        }
        if let Some(owner_id) = &filter.owner_id {
            query = query.bind(owner_id);
        }
        if let Some(featured) = filter.featured {
            query = query.bind(featured);
        }
        // SQLite treats a negative LIMIT as unbounded
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let offset = filter.offset.unwrap_or(0) as i64;
        let rows = query.bind(limit).bind(offset).fetch_all(&self.db).await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(self.hydrate(row).await?);
        }
        Ok(entities)
    }

    async fn save(&self, entity: &ModeratableEntity) -> ModerationResult<()> {
        let (status, featured, expires_at, suspended_until) = state_columns(&entity.state);

        let mut tx = self.db.begin().await?;

        let stored = sqlx::query(&format!(
            "SELECT {} FROM moderated_entity WHERE id = ?",
            ENTITY_COLUMNS
        ))
        .bind(&entity.id)
        .fetch_optional(&mut *tx)
        .await?;

        match stored {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO moderated_entity
                    (id, kind, status, owner_id, featured, expires_at, suspended_until, version, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&entity.id)
                .bind(entity.kind().as_str())
                .bind(status)
                .bind(&entity.owner_id)
                .bind(featured)
                .bind(expires_at)
                .bind(suspended_until)
                .bind(entity.version as i64)
                .bind(format_timestamp(&entity.created_at))
                .execute(&mut *tx)
                .await?;

                Self::append_audit_entries(&mut tx, entity, 0).await?;
            }
            Some(row) => {
                let mut current = parse_entity_row(&row)?;
                current.audit_log = fetch_audit_log(&mut *tx, &entity.id).await?;

                check_successor(&current, entity)?;

                let result = sqlx::query(
                    r#"
                    UPDATE moderated_entity
                    SET status = ?,
                        featured = ?,
                        expires_at = ?,
                        suspended_until = ?,
                        version = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(status)
                .bind(featured)
                .bind(expires_at)
                .bind(suspended_until)
                .bind(entity.version as i64)
                .bind(&entity.id)
                .bind(current.version as i64)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(ModerationError::Conflict(format!(
                        "Entity {} changed concurrently",
                        entity.id
                    )));
                }

                Self::append_audit_entries(&mut tx, entity, current.audit_log.len()).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Audit rows for one entity, oldest first
async fn fetch_audit_log<'c, E>(executor: E, entity_id: &str) -> ModerationResult<AuditLog>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT action, actor, note, timestamp
        FROM moderation_audit_entry
        WHERE entity_id = ?
        ORDER BY position ASC
        "#,
    )
    .bind(entity_id)
    .fetch_all(executor)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let timestamp: String = row.get("timestamp");
        // Blank notes written outside this store load as absent
        entries.push(AuditEntry::new(
            row.get::<String, _>("action"),
            row.get::<String, _>("actor"),
            parse_timestamp(&timestamp)?,
            row.get("note"),
        ));
    }

    Ok(AuditLog::from_entries(entries))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(s: &str) -> ModerationResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| ModerationError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc))
}

fn parse_optional_timestamp(value: Option<String>) -> ModerationResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Column values for the kind-specific state
fn state_columns(state: &EntityState) -> (&'static str, bool, Option<String>, Option<String>) {
    match state {
        EntityState::Listing {
            status,
            expires_at,
            featured,
        } => (
            status.as_str(),
            *featured,
            expires_at.as_ref().map(format_timestamp),
            None,
        ),
        EntityState::Account {
            status,
            suspended_until,
        } => (
            status.as_str(),
            false,
            None,
            suspended_until.as_ref().map(format_timestamp),
        ),
    }
}

/// Entity row without its audit log
fn parse_entity_row(row: &SqliteRow) -> ModerationResult<ModeratableEntity> {
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");

    let state = match EntityKind::from_str(&kind_str)? {
        EntityKind::Listing => EntityState::Listing {
            status: ListingStatus::from_str(&status_str)?,
            expires_at: parse_optional_timestamp(row.get("expires_at"))?,
            featured: row.get("featured"),
        },
        EntityKind::Account => EntityState::Account {
            status: AccountStatus::from_str(&status_str)?,
            suspended_until: parse_optional_timestamp(row.get("suspended_until"))?,
        },
    };

    let version: i64 = row.get("version");
    let created_at: String = row.get("created_at");

    Ok(ModeratableEntity {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        state,
        audit_log: AuditLog::default(),
        version: version as u64,
        created_at: parse_timestamp(&created_at)?,
    })
}
