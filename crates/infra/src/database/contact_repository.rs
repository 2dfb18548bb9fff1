//! SQLite-backed implementation of the contact repository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealsync_core::sync::ports::ContactRepository;
use dealsync_domain::{Contact, Result};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{DbConnection, DbManager};
use crate::errors::{map_db_error, map_join_error};

const CONTACT_COLUMNS: &str = "id, org_id, first_name, last_name, title, email, phone,
     account_id, salesforce_id, last_synced_at, created_at, updated_at";

/// SQLite contact repository.
pub struct SqliteContactRepository {
    db: Arc<DbManager>,
}

impl SqliteContactRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Contact>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Contact>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE org_id = ?1 AND salesforce_id IS NOT NULL"
            );
            collect_contacts(&conn, &sql, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Contact>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Contact>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE org_id = ?1
                   AND (salesforce_id IS NULL
                        OR last_synced_at IS NULL
                        OR updated_at > last_synced_at)"
            );
            collect_contacts(&conn, &sql, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Contact>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Contact>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");

            match conn.query_row(&sql, params![id], map_contact_row) {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_db_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, contact: &Contact) -> Result<()> {
        let db = Arc::clone(&self.db);
        let contact = contact.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO contacts (id, org_id, first_name, last_name, title, email, phone,
                     account_id, salesforce_id, last_synced_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    contact.id,
                    contact.org_id,
                    contact.first_name,
                    contact.last_name,
                    contact.title,
                    contact.email,
                    contact.phone,
                    contact.account_id,
                    contact.salesforce_id,
                    contact.last_synced_at,
                    contact.created_at,
                    contact.updated_at,
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, contact: &Contact) -> Result<()> {
        let db = Arc::clone(&self.db);
        let contact = contact.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE contacts
                 SET first_name = ?2, last_name = ?3, title = ?4, email = ?5, phone = ?6,
                     account_id = ?7, salesforce_id = ?8, last_synced_at = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    contact.id,
                    contact.first_name,
                    contact.last_name,
                    contact.title,
                    contact.email,
                    contact.phone,
                    contact.account_id,
                    contact.salesforce_id,
                    contact.last_synced_at,
                    contact.updated_at,
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn collect_contacts(conn: &DbConnection, sql: &str, org_id: &str) -> Result<Vec<Contact>> {
    let mut stmt = conn.prepare(sql).map_err(map_db_error)?;
    let rows = stmt
        .query_map(params![org_id], map_contact_row)
        .map_err(map_db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_error)?;
    Ok(rows)
}

fn map_contact_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        org_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        title: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        account_id: row.get(7)?,
        salesforce_id: row.get(8)?,
        last_synced_at: row.get::<_, Option<DateTime<Utc>>>(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
