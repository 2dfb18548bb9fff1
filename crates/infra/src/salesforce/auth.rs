//! OAuth token handling for the Salesforce connection.
//!
//! Credentials live in the per-organization credential store. When the API
//! signals an expired access token, the broker exchanges the stored refresh
//! token at the OAuth token endpoint and persists the rotated token before
//! the caller retries. A failed exchange surfaces as an authentication
//! error, distinct from every other failure class.

use std::sync::Arc;

use dealsync_core::sync::ports::{CredentialStore, OrgCredentials};
use dealsync_domain::{DealSyncError, Result, SalesforceConfig};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

/// Wire shape of a successful token-endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Present when Salesforce rotates the refresh token.
    refresh_token: Option<String>,
    /// Present on some grants; when absent the stored instance URL stands.
    instance_url: Option<String>,
}

/// Exchanges refresh tokens and persists the result.
pub struct TokenBroker {
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
    store: Arc<dyn CredentialStore>,
    org_id: String,
}

impl TokenBroker {
    pub fn new(
        http: HttpClient,
        config: &SalesforceConfig,
        store: Arc<dyn CredentialStore>,
        org_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            store,
            org_id: org_id.into(),
        }
    }

    /// Load the organization's stored credentials. Missing credentials are
    /// a configuration error surfaced before any API call is attempted.
    pub async fn credentials(&self) -> Result<OrgCredentials> {
        self.store.get(&self.org_id).await?.ok_or_else(|| {
            DealSyncError::Config(format!(
                "no Salesforce credentials stored for organization {}",
                self.org_id
            ))
        })
    }

    /// Exchange the stored refresh token for a fresh access token and
    /// persist it. Called when the API rejects the current token; the
    /// caller retries exactly once afterwards.
    pub async fn refresh(&self) -> Result<OrgCredentials> {
        let current = self.credentials().await?;

        debug!(org_id = %self.org_id, "exchanging refresh token");

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", current.refresh_token.as_str()),
        ];

        let builder = self.http.request(Method::POST, &self.token_url).form(&form);
        let response = self.http.send(builder).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(org_id = %self.org_id, %status, "refresh token exchange rejected");
            return Err(DealSyncError::Auth(format!(
                "refresh token exchange failed (HTTP {status}): {}",
                body.trim()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            DealSyncError::Auth(format!("unparseable token endpoint response: {e}"))
        })?;

        let rotated = OrgCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or(current.refresh_token),
            instance_url: token.instance_url.unwrap_or(current.instance_url),
        };

        self.store.put(&self.org_id, &rotated).await?;
        info!(org_id = %self.org_id, "access token refreshed");

        Ok(rotated)
    }
}
