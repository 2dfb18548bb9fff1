//! Salesforce REST client implementing the `CrmClient` port.
//!
//! Queries go through the SOQL query endpoint (following `nextRecordsUrl`
//! pagination), writes through the sobject endpoints. An expired access
//! token triggers one refresh-and-retry; every other failure is classified
//! by [`super::errors::SalesforceError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dealsync_core::sync::ports::{CredentialStore, CrmClient, OrgCredentials, RemoteQuery};
use dealsync_domain::{
    CreateResult, DealSyncError, QueryResponse, Result, SalesforceConfig, SfAccount,
    SfAccountPatch, SfContact, SfContactPatch, SfOpportunity, SfOpportunityPatch, SfUser,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

use super::auth::TokenBroker;
use super::errors::SalesforceError;
use crate::http::HttpClient;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ACCOUNT_FIELDS: &str = "Id, Name, Website, Industry, OwnerId, LastModifiedDate";
const CONTACT_FIELDS: &str =
    "Id, FirstName, LastName, Title, Email, Phone, AccountId, LastModifiedDate";
const OPPORTUNITY_FIELDS: &str = "Id, Name, Amount, CloseDate, StageName, Probability, \
                                  ForecastCategoryName, OwnerId, AccountId, LastModifiedDate";

/// Typed client for one organization's Salesforce connection.
///
/// Constructed per organization from stored credentials; never a
/// process-wide singleton.
pub struct SalesforceClient {
    http: HttpClient,
    broker: TokenBroker,
    api_version: String,
}

impl SalesforceClient {
    /// Build a client for one organization.
    ///
    /// Credential presence is checked lazily on the first call so that a
    /// factory can construct the client before deciding to run.
    pub fn new(
        config: &SalesforceConfig,
        store: Arc<dyn CredentialStore>,
        org_id: &str,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .max_attempts(3)
            .build()?;

        let broker = TokenBroker::new(http.clone(), config, store, org_id);

        Ok(Self { http, broker, api_version: config.api_version.clone() })
    }

    /// Issue an authorized request; on 401, refresh the access token and
    /// retry exactly once.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let credentials = self.broker.credentials().await?;
        let response = self.attempt(method.clone(), path, body, &credentials).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(path, "access token rejected, refreshing");
            let refreshed = self.broker.refresh().await?;
            return self.attempt(method, path, body, &refreshed).await;
        }

        Ok(response)
    }

    async fn attempt(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        credentials: &OrgCredentials,
    ) -> Result<Response> {
        let url = format!("{}{}", credentials.instance_url.trim_end_matches('/'), path);
        let mut builder = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", credentials.access_token));

        if let Some(json) = body {
            builder = builder.json(json);
        }

        self.http.send(builder).await
    }

    async fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SalesforceError::from_response(status, &body).into())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            DealSyncError::Internal(format!("unparseable Salesforce response: {e}"))
        })
    }

    /// Run a SOQL query, following pagination until the result set is
    /// complete.
    async fn query_rows<T>(&self, soql: String) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let encoded: String = form_urlencoded::byte_serialize(soql.as_bytes()).collect();
        let mut path = format!("/services/data/{}/query?q={}", self.api_version, encoded);
        let mut records = Vec::new();

        loop {
            let response = self.execute(Method::GET, &path, None).await?;
            let response = Self::expect_success(response).await?;
            let page: QueryResponse<T> = Self::read_json(response).await?;

            records.extend(page.records);

            match page.next_records_url {
                Some(next) => path = next,
                None => break,
            }
        }

        Ok(records)
    }

    async fn get_row<T: DeserializeOwned>(
        &self,
        sobject: &str,
        id: &str,
        fields: &str,
    ) -> Result<Option<T>> {
        let field_list: String = fields.split_whitespace().collect();
        let path = format!(
            "/services/data/{}/sobjects/{}/{}?fields={}",
            self.api_version, sobject, id, field_list
        );

        let response = self.execute(Method::GET, &path, None).await?;
        // A missing record is a normal outcome, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::expect_success(response).await?;
        Ok(Some(Self::read_json(response).await?))
    }

    async fn create_row<B: Serialize>(&self, sobject: &str, body: &B) -> Result<String> {
        let json = serde_json::to_value(body)
            .map_err(|e| DealSyncError::Internal(format!("unserializable {sobject}: {e}")))?;
        let path = format!("/services/data/{}/sobjects/{}", self.api_version, sobject);

        let response = self.execute(Method::POST, &path, Some(&json)).await?;
        let response = Self::expect_success(response).await?;
        let created: CreateResult = Self::read_json(response).await?;

        if !created.success {
            return Err(DealSyncError::Internal(format!(
                "{sobject} create reported failure without an error body"
            )));
        }

        Ok(created.id)
    }

    async fn update_row<B: Serialize>(&self, sobject: &str, id: &str, body: &B) -> Result<()> {
        let json = serde_json::to_value(body)
            .map_err(|e| DealSyncError::Internal(format!("unserializable {sobject}: {e}")))?;
        let path = format!("/services/data/{}/sobjects/{}/{}", self.api_version, sobject, id);

        let response = self.execute(Method::PATCH, &path, Some(&json)).await?;
        Self::expect_success(response).await.map(|_| ())
    }
}

/// Shared SOQL shape: optional exclusive lower bound on modification time,
/// newest first, optional cap.
fn soql(fields: &str, sobject: &str, filter: &RemoteQuery) -> String {
    let mut query = format!("SELECT {fields} FROM {sobject}");

    if let Some(since) = filter.modified_since {
        query.push_str(&format!(
            " WHERE LastModifiedDate > {}",
            since.format("%Y-%m-%dT%H:%M:%SZ")
        ));
    }

    query.push_str(" ORDER BY LastModifiedDate DESC");

    if let Some(limit) = filter.limit {
        query.push_str(&format!(" LIMIT {limit}"));
    }

    query
}

#[async_trait]
impl CrmClient for SalesforceClient {
    async fn query_users(&self) -> Result<Vec<SfUser>> {
        self.query_rows("SELECT Id, Email, Name FROM User WHERE IsActive = true".to_string())
            .await
    }

    async fn query_accounts(&self, filter: &RemoteQuery) -> Result<Vec<SfAccount>> {
        self.query_rows(soql(ACCOUNT_FIELDS, "Account", filter)).await
    }

    async fn get_account(&self, id: &str) -> Result<Option<SfAccount>> {
        self.get_row("Account", id, ACCOUNT_FIELDS).await
    }

    async fn create_account(&self, fields: &SfAccountPatch) -> Result<String> {
        self.create_row("Account", fields).await
    }

    async fn update_account(&self, id: &str, fields: &SfAccountPatch) -> Result<()> {
        self.update_row("Account", id, fields).await
    }

    async fn query_contacts(&self, filter: &RemoteQuery) -> Result<Vec<SfContact>> {
        self.query_rows(soql(CONTACT_FIELDS, "Contact", filter)).await
    }

    async fn get_contact(&self, id: &str) -> Result<Option<SfContact>> {
        self.get_row("Contact", id, CONTACT_FIELDS).await
    }

    async fn create_contact(&self, fields: &SfContactPatch) -> Result<String> {
        self.create_row("Contact", fields).await
    }

    async fn update_contact(&self, id: &str, fields: &SfContactPatch) -> Result<()> {
        self.update_row("Contact", id, fields).await
    }

    async fn query_opportunities(&self, filter: &RemoteQuery) -> Result<Vec<SfOpportunity>> {
        self.query_rows(soql(OPPORTUNITY_FIELDS, "Opportunity", filter)).await
    }

    async fn get_opportunity(&self, id: &str) -> Result<Option<SfOpportunity>> {
        self.get_row("Opportunity", id, OPPORTUNITY_FIELDS).await
    }

    async fn create_opportunity(&self, fields: &SfOpportunityPatch) -> Result<String> {
        self.create_row("Opportunity", fields).await
    }

    async fn update_opportunity(&self, id: &str, fields: &SfOpportunityPatch) -> Result<()> {
        self.update_row("Opportunity", id, fields).await
    }
}
