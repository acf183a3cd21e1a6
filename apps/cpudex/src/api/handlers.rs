//! Request handlers.
//!
//! Reads are open; create/update/delete/import require a valid bearer token
//! via the [`AuthClaims`] extractor, which rejects before any storage call.

use crate::api::auth::{AuthClaims, AuthError, TOKEN_TTL};
use crate::api::{ApiError, AppState};
use crate::config;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use cpudex_core::query::DEFAULT_PAGE_SIZE;
use cpudex_core::record::RecordId;
use cpudex_core::{
    CpuRecord, ImportOptions, Importer, Page, QueryService, RecordDraft, RecordPatch, Stats,
    export, generation,
};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    limit: Option<u64>,
}

impl PageParams {
    fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    #[serde(default)]
    clear_existing: bool,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    password: String,
}

// =============================================================================
// READ ENDPOINTS
// =============================================================================

pub async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "CPU Specifications API",
        "endpoints": {
            "all_cpus": "/api/cpus",
            "search": "/api/cpus/search?q=EPYC",
            "by_id": "/api/cpus/{id}",
            "stats": "/api/stats",
            "export_csv": "/api/export/csv",
            "export_excel": "/api/export/excel",
        }
    }))
}

pub async fn list_cpus(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page>, ApiError> {
    let page = QueryService::new(&state.store).list(params.offset(), params.limit())?;
    Ok(Json(page))
}

pub async fn search_cpus(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page>, ApiError> {
    let page = QueryService::new(&state.store).search(
        &params.q,
        params.offset.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(page))
}

pub async fn get_cpu(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CpuRecord>, ApiError> {
    let record = QueryService::new(&state.store).get_by_id(RecordId(id))?;
    Ok(Json(record))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(QueryService::new(&state.store).stats()?))
}

// =============================================================================
// EXPORT ENDPOINTS
// =============================================================================

pub async fn export_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state.store.all()?;
    let body = export::to_csv_string(&records)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment("csv")),
        ],
        body,
    )
        .into_response())
}

pub async fn export_excel(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state.store.all()?;
    let body = export::to_xlsx_bytes(&records)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (header::CONTENT_DISPOSITION, attachment("xlsx")),
        ],
        body,
    )
        .into_response())
}

fn attachment(extension: &str) -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("attachment; filename=\"cpu_export_{stamp}.{extension}\"")
}

// =============================================================================
// MUTATING ENDPOINTS (token-gated)
// =============================================================================

pub async fn create_cpu(
    State(state): State<AppState>,
    _claims: AuthClaims,
    Json(mut draft): Json<RecordDraft>,
) -> Result<(StatusCode, Json<CpuRecord>), ApiError> {
    let max_year = config::max_launch_year();
    draft.validate(max_year).map_err(ApiError::Core)?;

    // Derive the generation codename when the caller left it out.
    if draft.codename.is_none() {
        if let (Some(code), Some(year)) = (draft.model_code.as_deref(), draft.launch_year) {
            draft.codename =
                generation::infer_codename(code, year, draft.family.as_deref())
                    .map(str::to_string);
        }
    }

    let record = state.store.insert(draft)?;
    info!("created record {} ({})", record.id, record.model_name);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_cpu(
    State(state): State<AppState>,
    _claims: AuthClaims,
    Path(id): Path<u64>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<CpuRecord>, ApiError> {
    patch
        .validate(config::max_launch_year())
        .map_err(ApiError::Core)?;
    let record = state.store.update(RecordId(id), patch)?;
    Ok(Json(record))
}

pub async fn delete_cpu(
    State(state): State<AppState>,
    _claims: AuthClaims,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(RecordId(id))?;
    info!("deleted record {id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    _claims: AuthClaims,
    body: String,
) -> Result<Json<cpudex_core::ImportReport>, ApiError> {
    let options = ImportOptions {
        clear_existing: params.clear_existing,
        overwrite: params.overwrite,
    };
    let report = Importer::new(&state.store, options)
        .run(Cursor::new(body.into_bytes()), config::max_launch_year())?;
    info!(
        "import finished: {} inserted, {} updated, {} skipped, {} errors",
        report.inserted,
        report.updated,
        report.skipped,
        report.errors.len()
    );
    Ok(Json(report))
}

// =============================================================================
// AUTH ENDPOINTS
// =============================================================================

pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(gate) = state.gate.as_deref() else {
        return Err(ApiError::Auth(AuthError::NotConfigured));
    };
    let token = gate.issue(&request.password).map_err(ApiError::Auth)?;
    Ok(Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": TOKEN_TTL.as_secs(),
    })))
}

pub async fn whoami(claims: AuthClaims) -> Json<serde_json::Value> {
    Json(json!({
        "authenticated": true,
        "sub": claims.0.sub,
        "exp": claims.0.exp,
    }))
}
