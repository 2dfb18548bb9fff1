//! SQLite-backed implementation of the sync backlog port.
//!
//! One table queues failed exports for every entity type; `mark_failed`
//! upserts so the first failure creates the entry and later ones bump the
//! attempt counter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealsync_core::sync::ports::SyncBacklog;
use dealsync_domain::{BacklogEntry, EntityKind, Result};
use rusqlite::{params, Row};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::{map_db_error, map_join_error};

/// SQLite sync backlog repository.
pub struct SqliteBacklogRepository {
    db: Arc<DbManager>,
}

impl SqliteBacklogRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncBacklog for SqliteBacklogRepository {
    async fn enqueue(&self, entry: &BacklogEntry) -> Result<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_backlog (id, org_id, entity, record_id, attempts, last_error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(org_id, entity, record_id) DO NOTHING",
                params![
                    entry.id,
                    entry.org_id,
                    entry.entity.as_str(),
                    entry.record_id,
                    entry.attempts,
                    entry.last_error,
                    entry.created_at,
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn pending(
        &self,
        org_id: &str,
        entity: EntityKind,
        limit: usize,
    ) -> Result<Vec<BacklogEntry>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<BacklogEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, org_id, entity, record_id, attempts, last_error, created_at
                     FROM sync_backlog
                     WHERE org_id = ?1 AND entity = ?2
                     ORDER BY created_at ASC
                     LIMIT ?3",
                )
                .map_err(map_db_error)?;

            let rows = stmt
                .query_map(
                    params![org_id, entity.as_str(), limit as i64],
                    map_backlog_row,
                )
                .map_err(map_db_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_resolved(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();
        let record_id = record_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "DELETE FROM sync_backlog WHERE org_id = ?1 AND entity = ?2 AND record_id = ?3",
                params![org_id, entity.as_str(), record_id],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_failed(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
        error: &str,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();
        let record_id = record_id.to_string();
        let error = error.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_backlog (id, org_id, entity, record_id, attempts, last_error, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                 ON CONFLICT(org_id, entity, record_id) DO UPDATE SET
                     attempts = attempts + 1,
                     last_error = excluded.last_error",
                params![
                    Uuid::now_v7().to_string(),
                    org_id,
                    entity.as_str(),
                    record_id,
                    error,
                    Utc::now(),
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_backlog_row(row: &Row<'_>) -> rusqlite::Result<BacklogEntry> {
    let id: String = row.get(0)?;
    let entity_raw: String = row.get(2)?;

    Ok(BacklogEntry {
        entity: parse_entity(&id, &entity_raw),
        id,
        org_id: row.get(1)?,
        record_id: row.get(3)?,
        attempts: row.get(4)?,
        last_error: row.get(5)?,
        created_at: row.get::<_, DateTime<Utc>>(6)?,
    })
}

fn parse_entity(id: &str, raw: &str) -> EntityKind {
    match EntityKind::parse(raw) {
        Some(entity) => entity,
        None => {
            warn!(entry_id = id, entity = raw, "unknown backlog entity, defaulting to account");
            EntityKind::Account
        }
    }
}
