//! SQLite-backed implementation of the credential store port.
//!
//! One row per organization; the access token is replaced in place when the
//! broker refreshes it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dealsync_core::sync::ports::{CredentialStore, OrgCredentials};
use dealsync_domain::Result;
use rusqlite::params;
use tokio::task;

use super::manager::DbManager;
use crate::errors::{map_db_error, map_join_error};

/// SQLite credential store.
pub struct SqliteCredentialStore {
    db: Arc<DbManager>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, org_id: &str) -> Result<Option<OrgCredentials>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Option<OrgCredentials>> {
            let conn = db.get_connection()?;

            let result = conn.query_row(
                "SELECT access_token, refresh_token, instance_url
                 FROM org_credentials WHERE org_id = ?1",
                params![org_id],
                |row| {
                    Ok(OrgCredentials {
                        access_token: row.get(0)?,
                        refresh_token: row.get(1)?,
                        instance_url: row.get(2)?,
                    })
                },
            );

            match result {
                Ok(credentials) => Ok(Some(credentials)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_db_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn put(&self, org_id: &str, credentials: &OrgCredentials) -> Result<()> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();
        let credentials = credentials.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO org_credentials (org_id, access_token, refresh_token, instance_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(org_id) DO UPDATE SET
                     access_token = excluded.access_token,
                     refresh_token = excluded.refresh_token,
                     instance_url = excluded.instance_url,
                     updated_at = excluded.updated_at",
                params![
                    org_id,
                    credentials.access_token,
                    credentials.refresh_token,
                    credentials.instance_url,
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
