//! End-to-end bidirectional sync against a mocked Salesforce API and a
//! temporary SQLite database.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use dealsync_core::sync::ports::{CredentialStore, OrgCredentials};
use dealsync_core::SyncOptions;
use dealsync_infra::database::{
    DbManager, SqliteAccountRepository, SqliteContactRepository, SqliteCredentialStore,
    SqliteOpportunityRepository,
};
use dealsync_infra::SalesforceSyncService;
use dealsync_core::sync::ports::{AccountRepository, ContactRepository, OpportunityRepository};
use dealsync_domain::{
    Account, Config, Contact, DatabaseConfig, SalesforceConfig, SyncConfig, SyncRunStatus,
};
use rusqlite::params;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "org-1";

fn ts(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn config(server: &MockServer, db_path: &str) -> Config {
    Config {
        database: DatabaseConfig { path: db_path.to_string(), pool_size: 4 },
        salesforce: SalesforceConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: format!("{}/services/oauth2/token", server.uri()),
            api_version: "v59.0".to_string(),
        },
        sync: SyncConfig::default(),
    }
}

async fn setup_database(server: &MockServer) -> (Arc<DbManager>, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir created");
    let db_path = temp_dir.path().join("dealsync.db");

    let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager created"));
    manager.run_migrations().expect("migrations run");

    // One admin user, matching the remote admin by email.
    let conn = manager.get_connection().expect("connection");
    conn.execute(
        "INSERT INTO users (id, org_id, email, name, role)
         VALUES ('u-admin', ?1, 'admin@acme.example', 'Admin', 'admin')",
        params![ORG],
    )
    .expect("user seeded");
    drop(conn);

    let credentials = SqliteCredentialStore::new(Arc::clone(&manager));
    credentials
        .put(
            ORG,
            &OrgCredentials {
                access_token: "token-1".to_string(),
                refresh_token: "refresh-abc".to_string(),
                instance_url: server.uri(),
            },
        )
        .await
        .expect("credentials stored");

    (manager, temp_dir)
}

fn query_page(records: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "totalSize": records.as_array().map_or(0, Vec::len),
        "done": true,
        "records": records
    }))
}

async fn mount_remote_dataset(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param_contains("q", "FROM User"))
        .respond_with(query_page(serde_json::json!([{
            "Id": "005ADMIN00000001",
            "Email": "admin@acme.example",
            "Name": "Admin"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param_contains("q", "FROM Account"))
        .respond_with(query_page(serde_json::json!([{
            "Id": "001REMOTE0000001",
            "Name": "Globex",
            "Website": "https://globex.example",
            "Industry": "Energy",
            "OwnerId": "005ADMIN00000001",
            "LastModifiedDate": "2024-01-05T00:00:00.000+0000"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param_contains("q", "FROM Contact"))
        .respond_with(query_page(serde_json::json!([{
            "Id": "003REMOTE0000001",
            "FirstName": "Hank",
            "LastName": "Scorpio",
            "Title": "CEO",
            "Email": "hank@globex.example",
            "Phone": null,
            "AccountId": "001REMOTE0000001",
            "LastModifiedDate": "2024-01-05T00:00:00.000+0000"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query"))
        .and(query_param_contains("q", "FROM Opportunity"))
        .respond_with(query_page(serde_json::json!([{
            "Id": "006REMOTE0000001",
            "Name": "Globex renewal",
            "Amount": 1250.50,
            "CloseDate": "2024-06-30",
            "StageName": "Negotiation/Review",
            "Probability": 70.0,
            "ForecastCategoryName": "Best Case",
            "OwnerId": "005ADMIN00000001",
            "AccountId": "001REMOTE0000001",
            "LastModifiedDate": "2024-01-05T00:00:00.000+0000"
        }])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/services/data/v59.0/sobjects/Account"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "001NEW0000000001",
            "success": true,
            "errors": []
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/services/data/v59.0/sobjects/Contact"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "003NEW0000000001",
            "success": true,
            "errors": []
        })))
        .mount(server)
        .await;
}

fn local_account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        org_id: ORG.to_string(),
        name: "Acme Corp".to_string(),
        website: None,
        industry: None,
        owner_id: Some("u-admin".to_string()),
        salesforce_id: None,
        salesforce_last_modified: None,
        last_synced_at: None,
        created_at: ts(2024, 2, 1),
        updated_at: ts(2024, 2, 1),
    }
}

fn local_contact(id: &str, account_id: &str) -> Contact {
    Contact {
        id: id.to_string(),
        org_id: ORG.to_string(),
        first_name: "Grace".to_string(),
        last_name: Some("Hopper".to_string()),
        title: None,
        email: Some("grace@acme.example".to_string()),
        phone: None,
        account_id: Some(account_id.to_string()),
        salesforce_id: None,
        last_synced_at: None,
        created_at: ts(2024, 2, 1),
        updated_at: ts(2024, 2, 1),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn bidirectional_run_lands_remote_changes_and_pushes_local_ones() {
    let server = MockServer::start().await;
    let (manager, dir) = setup_database(&server).await;
    mount_remote_dataset(&server).await;

    // Local-only records that must go out during the export half.
    let accounts = SqliteAccountRepository::new(Arc::clone(&manager));
    let contacts = SqliteContactRepository::new(Arc::clone(&manager));
    accounts.insert(&local_account("a-local")).await.expect("account seeded");
    contacts.insert(&local_contact("c-local", "a-local")).await.expect("contact seeded");

    let db_path = dir.path().join("dealsync.db");
    let config = config(&server, &db_path.display().to_string());

    let service = SalesforceSyncService::for_org(ORG, &config, Arc::clone(&manager))
        .await
        .expect("service built");

    let summary = service.run(&SyncOptions::default()).await.expect("run completes");

    assert_eq!(summary.status(), SyncRunStatus::Success);
    assert_eq!(summary.import.accounts.created, 1);
    assert_eq!(summary.import.contacts.created, 1);
    assert_eq!(summary.import.opportunities.created, 1);
    assert_eq!(summary.export.accounts.created, 1);
    assert_eq!(summary.export.contacts.created, 1);

    // Imported opportunity landed with converted units and resolved keys.
    let opportunities = SqliteOpportunityRepository::new(Arc::clone(&manager));
    let imported = opportunities.find_synced(ORG).await.expect("query");
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].amount_cents, 125_050);
    assert_eq!(imported[0].confidence, 4);
    assert_eq!(imported[0].owner_id.as_deref(), Some("u-admin"));
    assert_eq!(imported[0].salesforce_last_modified, Some(ts(2024, 1, 5)));

    // The local account and its contact now carry remote identities.
    let pushed_account = accounts.find_by_id("a-local").await.expect("query").expect("present");
    assert_eq!(pushed_account.salesforce_id.as_deref(), Some("001NEW0000000001"));

    let pushed_contact = contacts.find_by_id("c-local").await.expect("query").expect("present");
    assert_eq!(pushed_contact.salesforce_id.as_deref(), Some("003NEW0000000001"));

    // A second run with nothing changed only skips.
    let second = service.run(&SyncOptions::default()).await.expect("second run");
    assert_eq!(second.status(), SyncRunStatus::Success);
    assert_eq!(second.import.accounts.created + second.import.accounts.updated, 0);
    assert_eq!(second.export.accounts.created + second.export.accounts.updated, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unconnected_organization_fails_before_any_network_call() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("temp dir created");
    let db_path = temp_dir.path().join("dealsync.db");

    let manager = Arc::new(DbManager::new(&db_path, 2).expect("db manager created"));
    manager.run_migrations().expect("migrations run");

    let config = config(&server, &db_path.display().to_string());
    let err = SalesforceSyncService::for_org("org-unconnected", &config, manager)
        .await
        .expect_err("no credentials");

    assert!(matches!(err, dealsync_domain::DealSyncError::Config(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
