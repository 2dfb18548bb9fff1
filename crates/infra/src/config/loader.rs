//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables (after reading a
//!    `.env` file when present)
//! 2. If incomplete, falls back to loading from file
//! 3. Probes a couple of conventional paths for config files
//! 4. Supports TOML and JSON formats
//!
//! ## Environment Variables
//! - `DEALSYNC_DB_PATH`: Database file path
//! - `DEALSYNC_DB_POOL_SIZE`: Connection pool size
//! - `DEALSYNC_SF_CLIENT_ID`: Salesforce connected-app client id
//! - `DEALSYNC_SF_CLIENT_SECRET`: Salesforce connected-app client secret
//! - `DEALSYNC_SF_TOKEN_URL`: OAuth token endpoint (optional)
//! - `DEALSYNC_SF_API_VERSION`: REST API version (optional)
//! - `DEALSYNC_SYNC_PAGE_LIMIT`: Remote query page cap (optional)

use std::path::{Path, PathBuf};

use dealsync_domain::{
    Config, DatabaseConfig, DealSyncError, Result, SalesforceConfig, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `DealSyncError::Config` if configuration cannot be loaded from
/// either source, the file format is invalid, or required fields are
/// missing.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();

    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. Returns an error
/// if any are missing.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("DEALSYNC_DB_PATH")?;
    let db_pool_size = match std::env::var("DEALSYNC_DB_POOL_SIZE") {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| DealSyncError::Config(format!("invalid pool size: {e}")))?,
        Err(_) => 4,
    };

    let client_id = env_var("DEALSYNC_SF_CLIENT_ID")?;
    let client_secret = env_var("DEALSYNC_SF_CLIENT_SECRET")?;

    let mut salesforce = SalesforceConfig {
        client_id,
        client_secret,
        ..default_salesforce()
    };
    if let Ok(token_url) = std::env::var("DEALSYNC_SF_TOKEN_URL") {
        salesforce.token_url = token_url;
    }
    if let Ok(api_version) = std::env::var("DEALSYNC_SF_API_VERSION") {
        salesforce.api_version = api_version;
    }

    let mut sync = SyncConfig::default();
    if let Ok(raw) = std::env::var("DEALSYNC_SYNC_PAGE_LIMIT") {
        sync.page_limit = raw
            .parse::<usize>()
            .map_err(|e| DealSyncError::Config(format!("invalid page limit: {e}")))?;
    }

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        salesforce,
        sync,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes conventional locations. Supports TOML and
/// JSON (detected by file extension).
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(DealSyncError::Config(format!(
                    "config file not found: {}",
                    explicit.display()
                )));
            }
            explicit.to_path_buf()
        }
        None => probe_config_paths().ok_or_else(|| {
            DealSyncError::Config("no configuration found in environment or files".into())
        })?,
    };

    let raw = std::fs::read_to_string(&path).map_err(|e| {
        DealSyncError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&raw)
            .map_err(|e| DealSyncError::Config(format!("invalid TOML config: {e}")))?,
        Some("json") => serde_json::from_str(&raw)
            .map_err(|e| DealSyncError::Config(format!("invalid JSON config: {e}")))?,
        other => {
            return Err(DealSyncError::Config(format!(
                "unsupported config extension: {other:?}"
            )))
        }
    };

    tracing::info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: [&str; 4] =
        ["config.toml", "config.json", "dealsync.toml", "dealsync.json"];

    CANDIDATES.iter().map(PathBuf::from).find(|candidate| candidate.exists())
}

fn default_salesforce() -> SalesforceConfig {
    SalesforceConfig {
        client_id: String::new(),
        client_secret: String::new(),
        token_url: "https://login.salesforce.com/services/oauth2/token".to_string(),
        api_version: "v59.0".to_string(),
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| DealSyncError::Config(format!("missing environment variable: {name}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn toml_file_parses_with_defaults_applied() {
        let mut file = NamedTempFile::with_suffix(".toml").expect("temp file");
        write!(
            file,
            r#"
[database]
path = "/tmp/dealsync.db"
pool_size = 2

[salesforce]
client_id = "client-id"
client_secret = "client-secret"
"#
        )
        .expect("written");

        let config = load_from_file(Some(file.path())).expect("parsed");
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.salesforce.api_version, "v59.0");
        assert!(config.salesforce.token_url.contains("login.salesforce.com"));
        assert_eq!(config.sync.page_limit, 200);
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        let err = load_from_file(Some(Path::new("/nonexistent/dealsync.toml")))
            .expect_err("missing file");
        assert!(matches!(err, DealSyncError::Config(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = NamedTempFile::with_suffix(".yaml").expect("temp file");
        write!(file, "database: {{}}").expect("written");

        let err = load_from_file(Some(file.path())).expect_err("unsupported");
        assert!(matches!(err, DealSyncError::Config(_)));
    }
}
