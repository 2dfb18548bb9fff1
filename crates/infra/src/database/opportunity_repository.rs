//! SQLite-backed implementation of the opportunity repository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealsync_core::sync::ports::OpportunityRepository;
use dealsync_domain::{
    ForecastCategory, Opportunity, OpportunitySyncStatus, PipelineStage, Result,
};
use rusqlite::{params, Row};
use tokio::task;
use tracing::warn;

use super::manager::{DbConnection, DbManager};
use crate::errors::{map_db_error, map_join_error};

const OPPORTUNITY_COLUMNS: &str = "id, org_id, name, amount_cents, close_date, stage, confidence,
     forecast_category, owner_id, account_id, salesforce_id, salesforce_last_modified,
     last_synced_at, sync_status, created_at, updated_at";

/// SQLite opportunity repository.
pub struct SqliteOpportunityRepository {
    db: Arc<DbManager>,
}

impl SqliteOpportunityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OpportunityRepository for SqliteOpportunityRepository {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Opportunity>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Opportunity>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities
                 WHERE org_id = ?1 AND salesforce_id IS NOT NULL"
            );
            collect_opportunities(&conn, &sql, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Opportunity>> {
        let db = Arc::clone(&self.db);
        let org_id = org_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Opportunity>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities
                 WHERE org_id = ?1
                   AND (salesforce_id IS NULL
                        OR last_synced_at IS NULL
                        OR updated_at > last_synced_at
                        OR sync_status = 'pending_push')"
            );
            collect_opportunities(&conn, &sql, &org_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Opportunity>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Opportunity>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = ?1");

            match conn.query_row(&sql, params![id], map_opportunity_row) {
                Ok(opportunity) => Ok(Some(opportunity)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_db_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, opportunity: &Opportunity) -> Result<()> {
        let db = Arc::clone(&self.db);
        let opportunity = opportunity.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO opportunities (id, org_id, name, amount_cents, close_date, stage,
                     confidence, forecast_category, owner_id, account_id, salesforce_id,
                     salesforce_last_modified, last_synced_at, sync_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    opportunity.id,
                    opportunity.org_id,
                    opportunity.name,
                    opportunity.amount_cents,
                    opportunity.close_date,
                    opportunity.stage.as_str(),
                    opportunity.confidence,
                    opportunity.forecast_category.map(ForecastCategory::as_str),
                    opportunity.owner_id,
                    opportunity.account_id,
                    opportunity.salesforce_id,
                    opportunity.salesforce_last_modified,
                    opportunity.last_synced_at,
                    opportunity.sync_status.as_str(),
                    opportunity.created_at,
                    opportunity.updated_at,
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, opportunity: &Opportunity) -> Result<()> {
        let db = Arc::clone(&self.db);
        let opportunity = opportunity.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE opportunities
                 SET name = ?2, amount_cents = ?3, close_date = ?4, stage = ?5, confidence = ?6,
                     forecast_category = ?7, owner_id = ?8, account_id = ?9, salesforce_id = ?10,
                     salesforce_last_modified = ?11, last_synced_at = ?12, sync_status = ?13,
                     updated_at = ?14
                 WHERE id = ?1",
                params![
                    opportunity.id,
                    opportunity.name,
                    opportunity.amount_cents,
                    opportunity.close_date,
                    opportunity.stage.as_str(),
                    opportunity.confidence,
                    opportunity.forecast_category.map(ForecastCategory::as_str),
                    opportunity.owner_id,
                    opportunity.account_id,
                    opportunity.salesforce_id,
                    opportunity.salesforce_last_modified,
                    opportunity.last_synced_at,
                    opportunity.sync_status.as_str(),
                    opportunity.updated_at,
                ],
            )
            .map_err(map_db_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn collect_opportunities(
    conn: &DbConnection,
    sql: &str,
    org_id: &str,
) -> Result<Vec<Opportunity>> {
    let mut stmt = conn.prepare(sql).map_err(map_db_error)?;
    let rows = stmt
        .query_map(params![org_id], map_opportunity_row)
        .map_err(map_db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_error)?;
    Ok(rows)
}

fn map_opportunity_row(row: &Row<'_>) -> rusqlite::Result<Opportunity> {
    let id: String = row.get(0)?;
    let stage_raw: String = row.get(5)?;
    let status_raw: String = row.get(13)?;
    let forecast_raw: Option<String> = row.get(7)?;

    Ok(Opportunity {
        stage: parse_stage(&id, &stage_raw),
        sync_status: parse_status(&id, &status_raw),
        forecast_category: forecast_raw.as_deref().and_then(ForecastCategory::parse),
        id,
        org_id: row.get(1)?,
        name: row.get(2)?,
        amount_cents: row.get(3)?,
        close_date: row.get(4)?,
        confidence: row.get(6)?,
        owner_id: row.get(8)?,
        account_id: row.get(9)?,
        salesforce_id: row.get(10)?,
        salesforce_last_modified: row.get::<_, Option<DateTime<Utc>>>(11)?,
        last_synced_at: row.get::<_, Option<DateTime<Utc>>>(12)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn parse_stage(id: &str, raw: &str) -> PipelineStage {
    match PipelineStage::parse(raw) {
        Some(stage) => stage,
        None => {
            warn!(opportunity_id = id, stage = raw, "unknown stored stage, defaulting");
            PipelineStage::Prospecting
        }
    }
}

fn parse_status(id: &str, raw: &str) -> OpportunitySyncStatus {
    match OpportunitySyncStatus::parse(raw) {
        Some(status) => status,
        None => {
            warn!(opportunity_id = id, status = raw, "unknown stored sync status, defaulting");
            OpportunitySyncStatus::Synced
        }
    }
}
