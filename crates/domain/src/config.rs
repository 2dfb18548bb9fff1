//! Configuration structures consumed by the loader in `dealsync-infra`.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub salesforce: SalesforceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Local SQLite store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Connected-app settings for the Salesforce REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    pub client_id: String,
    pub client_secret: String,
    /// OAuth token endpoint used for refresh-token exchange.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cap applied to each remote query page.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { page_limit: default_page_limit() }
    }
}

fn default_token_url() -> String {
    "https://login.salesforce.com/services/oauth2/token".to_string()
}

fn default_api_version() -> String {
    "v59.0".to_string()
}

fn default_page_limit() -> usize {
    200
}
