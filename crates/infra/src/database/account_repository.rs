//! SQLite-backed implementation of the account repository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealsync_core::sync::ports::AccountRepository;
use dealsync_domain::{Account, Result};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{DbConnection, DbManager};
use crate::errors::{map_db_error, map_join_error};

const ACCOUNT_COLUMNS: &str = "id, org_id, name, website, industry, owner_id, salesforce_id,
     salesforce_last_modified, last_synced_at, created_at, updated_at";

/// SQLite account repository.
pub struct SqliteAccountRepository {
    db: Arc<DbManager>,
}

impl SqliteAccountRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Account>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Account>> {
            let conn = db.get_connection()?;
            query_synced(&conn, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Account>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Account>> {
            let conn = db.get_connection()?;
            query_dirty(&conn, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Account>> {
            let conn = db.get_connection()?;
            query_by_id(&conn, &id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            insert_account(&conn, &account)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            update_account(&conn, &account)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_synced(conn: &DbConnection, org_id: &str) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts
         WHERE org_id = ?1 AND salesforce_id IS NOT NULL"
    );

    let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
    let rows = stmt
        .query_map(params![org_id], map_account_row)
        .map_err(map_db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_error)?;
    Ok(rows)
}

fn query_dirty(conn: &DbConnection, org_id: &str) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts
         WHERE org_id = ?1
           AND (salesforce_id IS NULL
                OR last_synced_at IS NULL
                OR updated_at > last_synced_at)"
    );

    let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
    let rows = stmt
        .query_map(params![org_id], map_account_row)
        .map_err(map_db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_error)?;
    Ok(rows)
}

fn query_by_id(conn: &DbConnection, id: &str) -> Result<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");

    match conn.query_row(&sql, params![id], map_account_row) {
        Ok(account) => Ok(Some(account)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(map_db_error(err)),
    }
}

fn insert_account(conn: &DbConnection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, org_id, name, website, industry, owner_id, salesforce_id,
             salesforce_last_modified, last_synced_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            account.id,
            account.org_id,
            account.name,
            account.website,
            account.industry,
            account.owner_id,
            account.salesforce_id,
            account.salesforce_last_modified,
            account.last_synced_at,
            account.created_at,
            account.updated_at,
        ],
    )
    .map_err(map_db_error)?;
    Ok(())
}

fn update_account(conn: &DbConnection, account: &Account) -> Result<()> {
    conn.execute(
        "UPDATE accounts
         SET name = ?2, website = ?3, industry = ?4, owner_id = ?5, salesforce_id = ?6,
             salesforce_last_modified = ?7, last_synced_at = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            account.id,
            account.name,
            account.website,
            account.industry,
            account.owner_id,
            account.salesforce_id,
            account.salesforce_last_modified,
            account.last_synced_at,
            account.updated_at,
        ],
    )
    .map_err(map_db_error)?;
    Ok(())
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        org_id: row.get(1)?,
        name: row.get(2)?,
        website: row.get(3)?,
        industry: row.get(4)?,
        owner_id: row.get(5)?,
        salesforce_id: row.get(6)?,
        salesforce_last_modified: row.get::<_, Option<DateTime<Utc>>>(7)?,
        last_synced_at: row.get::<_, Option<DateTime<Utc>>>(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
