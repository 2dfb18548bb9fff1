//! SQLite-backed implementation of the user repository port.

use std::sync::Arc;

use async_trait::async_trait;
use dealsync_core::sync::ports::UserRepository;
use dealsync_domain::{DealSyncError, Result, User, UserRole};
use rusqlite::{params, Row};
use tokio::task;
use tracing::warn;

use super::manager::DbManager;
use crate::errors::{map_db_error, map_join_error};

/// SQLite user repository.
pub struct SqliteUserRepository {
    db: Arc<DbManager>,
}

impl SqliteUserRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn list(&self, org_id: &str) -> Result<Vec<User>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<User>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, org_id, email, name, role, salesforce_id
                     FROM users WHERE org_id = ?1 ORDER BY rowid ASC",
                )
                .map_err(map_db_error)?;

            let rows = stmt
                .query_map(params![org_id], map_user_row)
                .map_err(map_db_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_salesforce_id(&self, user_id: &str, salesforce_id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let salesforce_id = salesforce_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE users SET salesforce_id = ?2 WHERE id = ?1",
                    params![user_id, salesforce_id],
                )
                .map_err(map_db_error)?;

            if changed == 0 {
                return Err(DealSyncError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role_raw: String = row.get(4)?;

    Ok(User {
        role: parse_role(&id, &role_raw),
        id,
        org_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        salesforce_id: row.get(5)?,
    })
}

fn parse_role(id: &str, raw: &str) -> UserRole {
    match UserRole::parse(raw) {
        Some(role) => role,
        None => {
            warn!(user_id = id, role = raw, "unknown stored role, defaulting to member");
            UserRole::Member
        }
    }
}
