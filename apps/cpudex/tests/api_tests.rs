//! Integration tests for the HTTP API.
//!
//! Each test spins up the full router against a fresh temporary store.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum_test::TestServer;
use cpudex::api::auth::AccessGate;
use cpudex::api::{AppState, router};
use cpudex_core::{RecordDraft, RedbStore};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

const PASSWORD: &str = "hunter2";

// =============================================================================
// HELPERS
// =============================================================================

struct TestApp {
    server: TestServer,
    store: Arc<RedbStore>,
    // Keeps the database and static dir alive for the test's duration.
    _dirs: (TempDir, TempDir),
}

fn spawn() -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let static_dir = tempfile::tempdir().unwrap();

    let store = Arc::new(RedbStore::open(db_dir.path().join("api.redb")).unwrap());
    let gate = AccessGate::new(PASSWORD, None);
    let state = AppState::new(Arc::clone(&store), Some(gate));

    let server = TestServer::new(router(state, static_dir.path())).unwrap();
    TestApp {
        server,
        store,
        _dirs: (db_dir, static_dir),
    }
}

async fn login(app: &TestApp) -> String {
    let response = app
        .server
        .post("/auth/token")
        .json(&json!({ "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn seed(app: &TestApp) {
    let mut epyc = RecordDraft::named("AMD EPYC 7763");
    epyc.family = Some("AMD EPYC".to_string());
    epyc.cores = Some(64);
    epyc.tdp_watts = Some(280.0);
    app.store.insert(epyc).unwrap();

    let mut xeon = RecordDraft::named("Intel Xeon Gold 6240");
    xeon.family = Some("Intel Xeon Gold".to_string());
    xeon.cores = Some(18);
    app.store.insert(xeon).unwrap();
}

// =============================================================================
// READ ENDPOINTS
// =============================================================================

#[tokio::test]
async fn list_returns_page_envelope() {
    let app = spawn();
    seed(&app);

    let response = app.server.get("/api/cpus").await;
    response.assert_status_ok();

    let page: Value = response.json();
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["model_name"], "AMD EPYC 7763");
}

#[tokio::test]
async fn list_clamps_oversized_limit() {
    let app = spawn();
    seed(&app);

    let response = app
        .server
        .get("/api/cpus")
        .add_query_param("limit", 999_999)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["limit"], 500);
}

#[tokio::test]
async fn get_by_id_and_missing_id() {
    let app = spawn();
    seed(&app);

    let ok = app.server.get("/api/cpus/1").await;
    ok.assert_status_ok();
    assert_eq!(ok.json::<Value>()["model_name"], "AMD EPYC 7763");

    let missing = app.server.get("/api/cpus/999").await;
    missing.assert_status_not_found();
    assert!(
        missing.json::<Value>()["detail"]
            .as_str()
            .unwrap()
            .contains("999")
    );
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let app = spawn();
    seed(&app);

    let lower = app
        .server
        .get("/api/cpus/search")
        .add_query_param("q", "epyc")
        .await;
    let upper = app
        .server
        .get("/api/cpus/search")
        .add_query_param("q", "EPYC")
        .await;

    lower.assert_status_ok();
    upper.assert_status_ok();
    assert_eq!(lower.json::<Value>(), upper.json::<Value>());
    assert_eq!(lower.json::<Value>()["total"], 1);
}

#[tokio::test]
async fn stats_exclude_absent_values() {
    let app = spawn();
    seed(&app);
    // A third record with no numeric data at all.
    app.store.insert(RecordDraft::named("Mystery CPU")).unwrap();

    let response = app.server.get("/api/stats").await;
    response.assert_status_ok();

    let stats: Value = response.json();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["distinct_families"], 2);
    assert_eq!(stats["cores"]["count"], 2);
    assert_eq!(stats["cores"]["avg"], 41.0);
    // Only one record carries a TDP; the blank ones must not count as zero.
    assert_eq!(stats["tdp_watts"]["count"], 1);
    assert_eq!(stats["tdp_watts"]["avg"], 280.0);
}

#[tokio::test]
async fn csv_export_carries_all_records() {
    let app = spawn();
    seed(&app);

    let response = app.server.get("/api/export/csv").await;
    response.assert_status_ok();
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );

    let body = response.text();
    assert!(body.starts_with("ID;CPU Model Name;"));
    assert!(body.contains("AMD EPYC 7763"));
    assert!(body.contains("Intel Xeon Gold 6240"));
}

#[tokio::test]
async fn excel_export_is_a_workbook() {
    let app = spawn();
    seed(&app);

    let response = app.server.get("/api/export/excel").await;
    response.assert_status_ok();
    let bytes = response.as_bytes();
    assert_eq!(&bytes[0..2], b"PK");
}

// =============================================================================
// ACCESS GATE
// =============================================================================

#[tokio::test]
async fn mutating_without_token_is_rejected_without_writes() {
    let app = spawn();

    let response = app
        .server
        .post("/api/cpus")
        .json(&json!({ "model_name": "Sneaky CPU" }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(app.store.count().unwrap(), 0);
}

#[tokio::test]
async fn tampered_token_is_rejected_without_writes() {
    let app = spawn();
    let token = login(&app).await;

    // Corrupt the signature half of the token.
    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('x') { 'y' } else { 'x' });

    let response = app
        .server
        .post("/api/cpus")
        .authorization_bearer(&tampered)
        .json(&json!({ "model_name": "Sneaky CPU" }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(app.store.count().unwrap(), 0);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn();

    // Mint a token whose 24h lifetime is already behind us.
    let gate = AccessGate::new(PASSWORD, None);
    let stale = gate.issue_at(PASSWORD, 1).unwrap();

    let response = app
        .server
        .delete("/api/cpus/1")
        .authorization_bearer(&stale)
        .await;
    response.assert_status_unauthorized();
    assert!(
        response.json::<Value>()["detail"]
            .as_str()
            .unwrap()
            .contains("expired")
    );
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = spawn();
    let response = app
        .server
        .post("/auth/token")
        .json(&json!({ "password": "letmein" }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn whoami_reports_principal() {
    let app = spawn();
    let token = login(&app).await;

    let response = app.server.get("/auth/me").authorization_bearer(&token).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["sub"], "admin");
}

// =============================================================================
// CRUD FLOW
// =============================================================================

#[tokio::test]
async fn create_update_delete_flow() {
    let app = spawn();
    let token = login(&app).await;

    // Create; codename derived from model code + launch year.
    let created = app
        .server
        .post("/api/cpus")
        .authorization_bearer(&token)
        .json(&json!({
            "model_name": "AMD EPYC 9654",
            "family": "AMD EPYC",
            "model_code": "EPYC 9654",
            "cores": 96,
            "launch_year": 2022
        }))
        .await;
    created.assert_status(axum::http::StatusCode::CREATED);
    let record: Value = created.json();
    assert_eq!(record["codename"], "Genoa");
    let id = record["id"].as_u64().unwrap();

    // Partial update leaves other fields alone.
    let updated = app
        .server
        .put(&format!("/api/cpus/{id}"))
        .authorization_bearer(&token)
        .json(&json!({ "tdp_watts": 360.0 }))
        .await;
    updated.assert_status_ok();
    let record: Value = updated.json();
    assert_eq!(record["tdp_watts"], 360.0);
    assert_eq!(record["cores"], 96);

    // Delete, then the record is gone.
    let deleted = app
        .server
        .delete(&format!("/api/cpus/{id}"))
        .authorization_bearer(&token)
        .await;
    deleted.assert_status(axum::http::StatusCode::NO_CONTENT);
    app.server
        .get(&format!("/api/cpus/{id}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn create_rejects_invalid_draft() {
    let app = spawn();
    let token = login(&app).await;

    let response = app
        .server
        .post("/api/cpus")
        .authorization_bearer(&token)
        .json(&json!({ "model_name": "Weird CPU", "tdp_watts": -5.0 }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(app.store.count().unwrap(), 0);
}

// =============================================================================
// IMPORT OVER HTTP
// =============================================================================

const CSV_HEADER: &str = "CPU Model Name;Family;CPU Model;Codename;Cores;Threads;\
Max Turbo Frequency (GHz);L3 Cache (MB);TDP (W);Launch Year;Max Memory (TB)";

#[tokio::test]
async fn import_reports_rows_and_errors() {
    let app = spawn();
    let token = login(&app).await;

    let body = format!(
        "{CSV_HEADER}\nCPU A;;;;8;;;;;;\n;;;;16;;;;;;\nCPU B;;;;32;;3,7;;;;\n"
    );
    let response = app
        .server
        .post("/api/import/csv")
        .authorization_bearer(&token)
        .text(body)
        .await;
    response.assert_status_ok();

    let report: Value = response.json();
    assert_eq!(report["inserted"], 2);
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    assert_eq!(report["errors"][0]["row"], 3);

    // The decimal comma survived as a real number.
    let page: Value = app.server.get("/api/cpus").await.json();
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][1]["max_turbo_ghz"], 3.7);
}

#[tokio::test]
async fn import_requires_token() {
    let app = spawn();
    let response = app
        .server
        .post("/api/import/csv")
        .text(format!("{CSV_HEADER}\nCPU A;;;;8;;;;;;\n"))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(app.store.count().unwrap(), 0);
}

#[tokio::test]
async fn reimport_without_overwrite_skips() {
    let app = spawn();
    let token = login(&app).await;
    let body = format!("{CSV_HEADER}\nCPU A;;;;8;;;;;;\n");

    app.server
        .post("/api/import/csv")
        .authorization_bearer(&token)
        .text(body.clone())
        .await
        .assert_status_ok();

    let second = app
        .server
        .post("/api/import/csv")
        .authorization_bearer(&token)
        .text(body)
        .await;
    let report: Value = second.json();
    assert_eq!(report["inserted"], 0);
    assert_eq!(report["skipped"], 1);
    assert_eq!(app.store.count().unwrap(), 1);
}
